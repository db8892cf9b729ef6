use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 受保护路径的规则集合，由平台提供，测试中可直接构造
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    /// 整棵子树都受保护（系统目录）
    pub protected_trees: Vec<PathBuf>,

    /// 只保护路径本身，不含子目录
    pub protected_paths: Vec<PathBuf>,

    /// 路径中任意一段命中即受保护（凭据类目录）
    pub credential_names: Vec<String>,

    /// 用户目录
    pub home: PathBuf,

    /// 用户目录下的重要文件夹
    pub home_critical: Vec<String>,

    /// 项目根目录标记文件
    pub project_markers: Vec<String>,

    /// 已知可安全删除的缓存目录名称
    pub safe_cache_names: Vec<String>,

    /// 已知可安全删除的缓存目录后缀
    pub safe_cache_suffixes: Vec<String>,

    /// 向上查找项目标记的层数
    pub marker_search_depth: usize,

    pub case_sensitive: bool,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl SafetyPolicy {
    /// 默认规则，不包含任何平台相关的系统目录
    pub fn new(home: PathBuf, case_sensitive: bool) -> Self {
        Self {
            protected_trees: Vec::new(),
            protected_paths: Vec::new(),
            credential_names: strings(&[
                ".ssh",
                ".gnupg",
                ".gpg",
                ".aws",
                ".kube",
                ".docker",
                "credentials",
                "secrets",
                ".password-store",
                "keyrings",
            ]),
            home,
            home_critical: strings(&[
                "Documents",
                "Desktop",
                "Downloads",
                "Pictures",
                "Music",
                "Videos",
            ]),
            project_markers: strings(&[
                ".git",
                "package.json",
                "pyproject.toml",
                "setup.py",
                "Cargo.toml",
                "go.mod",
                "pom.xml",
                "build.gradle",
            ]),
            safe_cache_names: strings(&[
                "node_modules",
                "__pycache__",
                ".pytest_cache",
                ".mypy_cache",
                ".ruff_cache",
                ".tox",
                ".nox",
                ".next",
                ".nuxt",
                ".cache",
                ".parcel-cache",
                ".turbo",
                ".gradle",
                "target",
                "build",
                "dist",
                ".venv",
                "venv",
                ".eggs",
                "htmlcov",
                "_build",
                ".terraform",
            ]),
            safe_cache_suffixes: strings(&[".egg-info"]),
            marker_search_depth: 4,
            case_sensitive,
        }
    }
}

/// 安全闸门，构建后只读
#[derive(Debug, Clone)]
pub struct SafetyGate {
    policy: SafetyPolicy,
    protected_trees: Vec<PathBuf>,
    protected_paths: Vec<PathBuf>,
    credential_names: HashSet<String>,
    home: PathBuf,
    home_critical: HashSet<String>,
    safe_cache_names: HashSet<String>,
}

impl SafetyGate {
    pub fn new(policy: SafetyPolicy) -> Self {
        let cs = policy.case_sensitive;
        let fold_set = |values: &[String]| -> HashSet<String> {
            values.iter().map(|v| fold(v, cs)).collect()
        };

        Self {
            protected_trees: policy.protected_trees.iter().map(|p| fold_path(p, cs)).collect(),
            protected_paths: policy.protected_paths.iter().map(|p| fold_path(p, cs)).collect(),
            credential_names: fold_set(&policy.credential_names),
            home: fold_path(&policy.home, cs),
            home_critical: fold_set(&policy.home_critical),
            safe_cache_names: fold_set(&policy.safe_cache_names),
            policy,
        }
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// 路径是否禁止被提议删除
    pub fn is_protected(&self, path: &Path) -> bool {
        let folded = fold_path(path, self.policy.case_sensitive);

        if folded.parent().is_none() || folded == self.home {
            return true;
        }

        let is_safe_cache = self.is_known_cache(path);

        if !is_safe_cache && self.under_protected_tree(&folded) {
            return true;
        }

        if self.protected_paths.iter().any(|p| *p == folded) {
            return true;
        }

        if self.has_credential_segment(&folded) {
            return true;
        }

        if let (Some(parent), Some(name)) = (folded.parent(), folded.file_name()) {
            if parent == self.home && self.home_critical.contains(name.to_string_lossy().as_ref()) {
                return true;
            }
        }

        if !is_safe_cache && path.is_dir() && self.inside_project(path) {
            return true;
        }

        false
    }

    /// 遍历时是否整个跳过该目录
    ///
    /// 只看系统目录树和凭据目录；用户目录本身和重要文件夹仍需向下遍历。
    pub fn blocks_traversal(&self, path: &Path) -> bool {
        let folded = fold_path(path, self.policy.case_sensitive);
        (self.under_protected_tree(&folded) && !self.is_known_cache(path))
            || self.has_credential_segment(&folded)
    }

    /// 名称是否为已知可安全删除的缓存目录
    pub fn is_known_cache(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(name) => fold(&name.to_string_lossy(), self.policy.case_sensitive),
            None => return false,
        };
        self.safe_cache_names.contains(&name)
            || self
                .policy
                .safe_cache_suffixes
                .iter()
                .any(|suffix| name.ends_with(&fold(suffix, self.policy.case_sensitive)))
    }

    fn under_protected_tree(&self, folded: &Path) -> bool {
        self.protected_trees.iter().any(|tree| folded.starts_with(tree))
    }

    fn has_credential_segment(&self, folded: &Path) -> bool {
        folded
            .iter()
            .any(|segment| self.credential_names.contains(segment.to_string_lossy().as_ref()))
    }

    /// 路径本身或向上若干层内是否存在项目标记
    fn inside_project(&self, path: &Path) -> bool {
        path.ancestors()
            .take(self.policy.marker_search_depth + 1)
            .any(|dir| {
                self.policy
                    .project_markers
                    .iter()
                    .any(|marker| dir.join(marker).exists())
            })
    }
}

fn fold(value: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        value.to_string()
    } else {
        value.to_lowercase()
    }
}

fn fold_path(path: &Path, case_sensitive: bool) -> PathBuf {
    if case_sensitive {
        path.to_path_buf()
    } else {
        PathBuf::from(path.to_string_lossy().to_lowercase())
    }
}
