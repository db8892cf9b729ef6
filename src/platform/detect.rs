use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::safety::SafetyPolicy;

/// 当前运行平台的信息
#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    /// Windows / macOS / Linux
    pub name: String,

    /// 例如 "Ubuntu 22.04"、"WSL (Ubuntu)"
    pub variant: String,

    pub home_dir: PathBuf,

    pub is_wsl: bool,

    pub wsl_distro: Option<String>,

    /// WSL 下对应的 Windows 用户目录
    pub windows_home: Option<PathBuf>,

    /// 文件系统是否区分大小写
    pub case_sensitive: bool,
}

/// 缓存根目录的类别，可按类别开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheRootKind {
    System,
    Browser,
    PackageManagers,
    Apps,
}

impl CacheRootKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheRootKind::System => "system",
            CacheRootKind::Browser => "browser",
            CacheRootKind::PackageManagers => "package_managers",
            CacheRootKind::Apps => "apps",
        }
    }
}

/// 一个已知的缓存根目录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheRoot {
    pub kind: CacheRootKind,
    pub path: PathBuf,
}

impl PlatformInfo {
    /// 检测当前平台
    pub fn detect() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));

        match env::consts::OS {
            "windows" => Self {
                name: "Windows".to_string(),
                variant: "Windows".to_string(),
                home_dir,
                is_wsl: false,
                wsl_distro: None,
                windows_home: None,
                case_sensitive: false,
            },
            "macos" => Self {
                name: "macOS".to_string(),
                variant: "macOS".to_string(),
                home_dir,
                is_wsl: false,
                wsl_distro: None,
                windows_home: None,
                case_sensitive: false,
            },
            "linux" => {
                if is_wsl_kernel() {
                    let distro =
                        env::var("WSL_DISTRO_NAME").unwrap_or_else(|_| "Unknown".to_string());
                    Self {
                        name: "Linux".to_string(),
                        variant: format!("WSL ({})", distro),
                        home_dir,
                        is_wsl: true,
                        wsl_distro: Some(distro),
                        windows_home: find_windows_home(),
                        case_sensitive: true,
                    }
                } else {
                    Self {
                        name: "Linux".to_string(),
                        variant: linux_distro(),
                        home_dir,
                        is_wsl: false,
                        wsl_distro: None,
                        windows_home: None,
                        case_sensitive: true,
                    }
                }
            }
            other => Self {
                name: other.to_string(),
                variant: "Unknown".to_string(),
                home_dir,
                is_wsl: false,
                wsl_distro: None,
                windows_home: None,
                case_sensitive: true,
            },
        }
    }

    /// 已知的缓存根目录（只返回实际存在的）
    pub fn cache_roots(&self) -> Vec<CacheRoot> {
        self.candidate_cache_roots()
            .into_iter()
            .filter(|root| root.path.is_dir())
            .collect()
    }

    /// 包管理器缓存根目录（只返回实际存在的）
    pub fn package_cache_roots(&self) -> Vec<PathBuf> {
        self.cache_roots()
            .into_iter()
            .filter(|root| root.kind == CacheRootKind::PackageManagers)
            .map(|root| root.path)
            .collect()
    }

    fn candidate_cache_roots(&self) -> Vec<CacheRoot> {
        use CacheRootKind::*;

        let home = &self.home_dir;
        let mut roots = Vec::new();
        let mut push = |kind, path: PathBuf| roots.push(CacheRoot { kind, path });

        match self.name.as_str() {
            "Windows" => {
                if let Some(local) = dirs::cache_dir() {
                    push(System, local.join("Temp"));
                    push(Browser, local.join("Google").join("Chrome").join("User Data"));
                    push(Browser, local.join("Microsoft").join("Edge").join("User Data"));
                    push(Browser, local.join("Mozilla").join("Firefox").join("Profiles"));
                    push(PackageManagers, local.join("npm-cache"));
                    push(PackageManagers, local.join("pip").join("cache"));
                    push(PackageManagers, local.join("Yarn").join("Cache"));
                    push(PackageManagers, local.join("NuGet").join("v3-cache"));
                    push(PackageManagers, local.join("go-build"));
                }
                if let Some(roaming) = dirs::config_dir() {
                    push(Apps, roaming.join("Code"));
                    push(Apps, roaming.join("Slack"));
                    push(Apps, roaming.join("discord"));
                    push(Apps, roaming.join("Microsoft").join("Teams"));
                    push(Apps, roaming.join("Spotify"));
                }
            }
            "macOS" => {
                let library = home.join("Library");
                push(System, library.join("Caches"));
                push(Browser, library.join("Caches").join("Google").join("Chrome"));
                push(Browser, library.join("Application Support").join("Google").join("Chrome"));
                push(Browser, library.join("Caches").join("Firefox").join("Profiles"));
                push(Browser, library.join("Caches").join("com.apple.Safari"));
                push(Apps, library.join("Application Support").join("Code"));
                push(Apps, library.join("Application Support").join("Slack"));
                push(Apps, library.join("Application Support").join("discord"));
                push(Apps, library.join("Caches").join("JetBrains"));
                push(Apps, library.join("Application Support").join("zoom.us"));
            }
            _ => {
                let cache = home.join(".cache");
                let config = home.join(".config");
                push(System, cache.clone());
                push(System, home.join(".local").join("share").join("Trash"));
                push(Browser, config.join("google-chrome"));
                push(Browser, config.join("chromium"));
                push(Browser, config.join("microsoft-edge"));
                push(Browser, home.join(".mozilla").join("firefox"));
                push(Apps, config.join("Code"));
                push(Apps, config.join("Slack"));
                push(Apps, config.join("discord"));
                push(Apps, config.join("Microsoft").join("Microsoft Teams"));
                push(Apps, config.join("spotify"));
                push(Apps, cache.join("JetBrains"));

                if let Some(windows_home) = &self.windows_home {
                    let local = windows_home.join("AppData").join("Local");
                    push(System, local.join("Temp"));
                    push(Browser, local.join("Google").join("Chrome").join("User Data"));
                    push(Browser, local.join("Microsoft").join("Edge").join("User Data"));
                    push(PackageManagers, local.join("npm-cache"));
                    push(PackageManagers, local.join("pip").join("cache"));
                }
            }
        }

        if self.name != "Windows" {
            push(PackageManagers, home.join(".npm"));
            push(PackageManagers, home.join(".yarn"));
            push(PackageManagers, home.join(".pnpm-store"));
            push(PackageManagers, home.join(".local").join("share").join("pnpm"));
            push(PackageManagers, home.join(".cache").join("pip"));
            push(PackageManagers, home.join(".cache").join("yarn"));
            push(PackageManagers, home.join(".cache").join("go-build"));
            push(PackageManagers, home.join(".cargo"));
            push(PackageManagers, home.join("go").join("pkg"));
            push(PackageManagers, home.join(".gradle"));
            push(PackageManagers, home.join(".m2"));
            push(PackageManagers, home.join(".composer"));
            push(PackageManagers, home.join(".nuget"));
            push(PackageManagers, home.join(".bundle"));
        }

        roots
    }

    /// 当前平台的安全策略
    pub fn safety_policy(&self) -> SafetyPolicy {
        let mut policy = SafetyPolicy::new(self.home_dir.clone(), self.case_sensitive);

        let trees: &[&str] = match self.name.as_str() {
            "Windows" => &[
                r"C:\Windows",
                r"C:\Program Files",
                r"C:\Program Files (x86)",
                r"C:\ProgramData",
                r"C:\Users\Default",
                r"C:\Users\Public",
                r"C:\$Recycle.Bin",
                r"C:\System Volume Information",
            ],
            "macOS" => &[
                "/System",
                "/Library",
                "/private",
                "/cores",
                "/Applications",
                "/bin",
                "/sbin",
                "/usr",
            ],
            _ => &[
                "/bin", "/boot", "/dev", "/etc", "/lib", "/lib64", "/opt", "/proc", "/root",
                "/run", "/sbin", "/srv", "/sys", "/tmp", "/usr", "/var",
            ],
        };
        policy.protected_trees = trees.iter().map(PathBuf::from).collect();

        if self.name == "macOS" {
            policy.protected_trees.push(self.home_dir.join("Library").join("Application Support"));
            policy.protected_trees.push(self.home_dir.join("Library").join("Preferences"));
        }
        if self.is_wsl {
            for tree in [
                "/mnt/c/Windows",
                "/mnt/c/Program Files",
                "/mnt/c/Program Files (x86)",
                "/mnt/c/ProgramData",
            ] {
                policy.protected_trees.push(PathBuf::from(tree));
            }
        }
        policy.protected_paths.push(self.home_dir.join(".config"));
        policy.protected_paths.push(self.home_dir.join(".local").join("share"));

        // 以 root 身份运行时 home 位于 /root 之下
        let home = self.home_dir.clone();
        policy.protected_trees.retain(|tree| !home.starts_with(tree));

        policy
    }
}

/// 是否需要排除 Windows 一侧的路径
pub fn is_windows_mount(path: &Path) -> bool {
    path.starts_with("/mnt/")
}

fn is_wsl_kernel() -> bool {
    fs::read_to_string("/proc/version")
        .map(|version| {
            let version = version.to_lowercase();
            version.contains("microsoft") || version.contains("wsl")
        })
        .unwrap_or(false)
}

fn find_windows_home() -> Option<PathBuf> {
    let users = Path::new("/mnt/c/Users");
    if let Some(user) = env::var("LOGNAME").ok().or_else(|| env::var("USER").ok()) {
        let candidate = users.join(user);
        if candidate.is_dir() {
            return Some(candidate);
        }
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(users)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    entries.sort();

    entries.into_iter().find(|path| {
        let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        !(name.starts_with("Default") || name.starts_with("Public") || name.starts_with("All"))
    })
}

fn linux_distro() -> String {
    let content = match fs::read_to_string("/etc/os-release") {
        Ok(content) => content,
        Err(_) => return "Linux".to_string(),
    };

    let value = |key: &str| {
        content
            .lines()
            .find_map(|line| line.strip_prefix(key))
            .map(|v| v.trim().trim_matches('"').to_string())
    };

    value("PRETTY_NAME=")
        .or_else(|| value("NAME="))
        .unwrap_or_else(|| "Linux".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::SafetyGate;
    use tempfile::tempdir;

    fn linux_info(home: &Path) -> PlatformInfo {
        PlatformInfo {
            name: "Linux".to_string(),
            variant: "Test".to_string(),
            home_dir: home.to_path_buf(),
            is_wsl: false,
            wsl_distro: None,
            windows_home: None,
            case_sensitive: true,
        }
    }

    #[test]
    fn test_detect_has_home() {
        let info = PlatformInfo::detect();
        assert!(!info.name.is_empty());
        assert!(info.home_dir.is_absolute());
    }

    #[test]
    fn test_cache_roots_only_existing() {
        let home = tempdir().unwrap();
        fs::create_dir_all(home.path().join(".cache")).unwrap();
        fs::create_dir_all(home.path().join(".npm")).unwrap();

        let roots = linux_info(home.path()).cache_roots();

        let has_root = |kind: CacheRootKind, name: &str| {
            roots.iter().any(|r| r.kind == kind && r.path == home.path().join(name))
        };
        assert!(has_root(CacheRootKind::System, ".cache"));
        assert!(has_root(CacheRootKind::PackageManagers, ".npm"));
        assert!(roots.iter().all(|r| r.path.is_dir()));
        assert!(!roots.iter().any(|r| r.path.ends_with(".m2")));
    }

    #[test]
    fn test_package_cache_roots() {
        let home = tempdir().unwrap();
        fs::create_dir_all(home.path().join(".m2")).unwrap();
        fs::create_dir_all(home.path().join(".cache")).unwrap();

        let roots = linux_info(home.path()).package_cache_roots();
        assert_eq!(roots, vec![home.path().join(".m2")]);
    }

    #[test]
    fn test_linux_system_subtrees_protected() {
        let gate = SafetyGate::new(linux_info(Path::new("/home/dev")).safety_policy());

        for path in ["/var/log", "/var/tmp", "/var/lib/dpkg", "/tmp/session", "/usr/share/doc"] {
            assert!(gate.is_protected(Path::new(path)), "{} should be protected", path);
            assert!(gate.blocks_traversal(Path::new(path)), "{} should not be walked", path);
        }
        assert!(gate.is_protected(Path::new("/var")));
        assert!(gate.is_protected(Path::new("/tmp")));
    }

    #[test]
    fn test_known_cache_under_system_tree_stays_eligible() {
        let gate = SafetyGate::new(linux_info(Path::new("/home/dev")).safety_policy());

        assert!(!gate.is_protected(Path::new("/var/lib/app/node_modules")));
        assert!(!gate.is_protected(Path::new("/home/dev/work/node_modules")));
    }

    #[test]
    fn test_home_under_protected_tree_is_not_blocked() {
        let gate = SafetyGate::new(linux_info(Path::new("/var/lib/builder")).safety_policy());

        assert!(!gate.blocks_traversal(Path::new("/var/lib/builder/src")));
        assert!(gate.is_protected(Path::new("/var/lib/builder")));
    }

    #[test]
    fn test_windows_mount_filter() {
        assert!(is_windows_mount(Path::new("/mnt/c/Users/me/AppData")));
        assert!(!is_windows_mount(Path::new("/home/me/.cache")));
    }
}
