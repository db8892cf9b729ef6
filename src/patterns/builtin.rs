//! 内置模式目录

use super::{Pattern, Requirement, SafetyLevel};
use super::SafetyLevel::{Caution, ProtectedExempt};

fn literals(
    name: &str,
    expressions: &[&str],
    category: &str,
    level: SafetyLevel,
    description: &str,
) -> Vec<Pattern> {
    expressions
        .iter()
        .map(|expr| {
            Pattern::literal(name, expr, category)
                .safety(level)
                .describe(description)
        })
        .collect()
}

fn regexes(
    name: &str,
    expressions: &[&str],
    category: &str,
    level: SafetyLevel,
    description: &str,
) -> Vec<Pattern> {
    expressions
        .iter()
        .map(|expr| {
            Pattern::regex(name, expr, category)
                .safety(level)
                .describe(description)
        })
        .collect()
}

const SAFE: SafetyLevel = SafetyLevel::Safe;

/// 语言工具链与构建缓存
pub fn cache_patterns() -> Vec<Pattern> {
    [
        literals("__pycache__", &["__pycache__"], "Python", SAFE, "Python bytecode cache"),
        literals(".pytest_cache", &[".pytest_cache"], "Python", SAFE, "Pytest cache directory"),
        literals(".mypy_cache", &[".mypy_cache"], "Python", SAFE, "Mypy type checker cache"),
        literals(".ruff_cache", &[".ruff_cache"], "Python", SAFE, "Ruff linter cache"),
        literals(".tox", &[".tox"], "Python", SAFE, "Tox test environments"),
        literals(".nox", &[".nox"], "Python", SAFE, "Nox test environments"),
        literals(".coverage", &["htmlcov", ".coverage"], "Python", SAFE, "Coverage reports"),
        literals(
            "node_modules",
            &["node_modules"],
            "Node.js",
            SAFE,
            "Node.js dependencies (reinstallable with npm/yarn)",
        ),
        literals(".next", &[".next"], "Node.js", SAFE, "Next.js build cache"),
        literals(".nuxt", &[".nuxt"], "Node.js", SAFE, "Nuxt.js build cache"),
        literals(".parcel-cache", &[".parcel-cache"], "Node.js", SAFE, "Parcel bundler cache"),
        literals(".turbo", &[".turbo"], "Node.js", SAFE, "Turborepo cache"),
        literals("target", &["target"], "Rust", Caution, "Rust/Cargo build artifacts"),
        literals(".gradle", &[".gradle"], "Java", SAFE, "Gradle build cache"),
        literals("build", &["build"], "Build", Caution, "Build output directory"),
        literals(".cache", &[".cache"], "Generic", SAFE, "Generic cache directory"),
        literals("tmp", &["tmp", "temp", ".tmp"], "Generic", SAFE, "Temporary files"),
    ]
    .concat()
}

/// 开发环境产生的目录
pub fn dev_patterns() -> Vec<Pattern> {
    let venv = Requirement::ContainsAny(vec![
        "pyvenv.cfg".to_string(),
        "bin/activate".to_string(),
        "Scripts/activate.bat".to_string(),
    ]);
    let dist = Requirement::ParentContainsAny(vec![
        "setup.py".to_string(),
        "pyproject.toml".to_string(),
    ]);

    let mut patterns: Vec<Pattern> = [".venv", "venv", ".virtualenv", "virtualenv", "env"]
        .iter()
        .map(|expr| {
            Pattern::literal(".venv", expr, "Python")
                .safety(Caution)
                .describe("Python virtual environment")
                .requires(venv.clone())
        })
        .collect();

    patterns.extend(literals(".eggs", &[".eggs"], "Python", SAFE, "Python egg files"));
    patterns.extend(regexes(
        "*.egg-info",
        &[r".*\.egg-info$"],
        "Python",
        SAFE,
        "Python package metadata"),
    );
    patterns.push(
        Pattern::literal("dist", "dist", "Build")
            .safety(Caution)
            .describe("Distribution files")
            .requires(dist),
    );
    patterns.extend(literals(".idea", &[".idea"], "IDE", Caution, "JetBrains IDE settings"));
    patterns.extend(literals(".vscode", &[".vscode"], "IDE", Caution, "VS Code settings"));
    patterns.extend(literals(
        "docs/_build",
        &["_build"],
        "Docs",
        SAFE,
        "Sphinx documentation build"),
    );
    patterns.extend(literals("site", &["site"], "Docs", Caution, "MkDocs build output"));
    patterns.extend(
        ["logs", "log"]
            .iter()
            .map(|expr| {
                Pattern::literal("logs", expr, "Logs")
                    .safety(Caution)
                    .describe("Log directories")
                    .excluding(&["var"])
            }),
    );
    patterns.extend(literals(
        "vendor",
        &["vendor", "vendors"],
        "Vendor",
        Caution,
        "Vendored dependencies"),
    );
    patterns.extend(literals(".docker", &[".docker"], "Docker", SAFE, "Docker build cache"));
    patterns.extend(literals(
        ".terraform",
        &[".terraform"],
        "IaC",
        SAFE,
        "Terraform provider cache"),
    );
    patterns
}

/// 操作系统与版本控制留下的文件
pub fn system_patterns() -> Vec<Pattern> {
    [
        literals(".DS_Store", &[".DS_Store"], "System", SAFE, "macOS folder metadata"),
        literals("__MACOSX", &["__MACOSX"], "System", SAFE, "macOS resource fork data"),
        literals(
            "Thumbs.db",
            &["Thumbs.db", "thumbs.db"],
            "System",
            SAFE,
            "Windows thumbnail cache",
        ),
        literals("desktop.ini", &["desktop.ini"], "System", SAFE, "Windows folder settings"),
        literals(
            ".git",
            &[".git"],
            "VCS",
            ProtectedExempt,
            "Git repository (use 'git gc' to clean)",
        ),
        literals(".svn", &[".svn"], "VCS", ProtectedExempt, "Subversion metadata"),
        literals(".hg", &[".hg"], "VCS", ProtectedExempt, "Mercurial metadata"),
        vec![
            Pattern::glob("*.bak", "*.bak", "Backup").safety(Caution).describe("Backup files"),
            Pattern::glob("*.bak", "*~", "Backup").safety(Caution).describe("Backup files"),
        ],
        literals(
            "crash",
            &["CrashDumps", "crash_dumps", "dumps"],
            "System",
            SAFE,
            "Crash dump files",
        ),
    ]
    .concat()
}

/// 项目目录扫描使用的完整目录
pub fn bloat_patterns() -> Vec<Pattern> {
    [cache_patterns(), dev_patterns(), system_patterns()].concat()
}

/// 浏览器缓存
pub fn browser_patterns() -> Vec<Pattern> {
    [
        literals(
            "Chrome Cache",
            &["Cache", "Code Cache", "GPUCache", "ShaderCache", "GrShaderCache"],
            "Browser",
            SAFE,
            "Chrome browser cache",
        ),
        literals(
            "Chrome Media Cache",
            &["Media Cache", "Service Worker"],
            "Browser",
            SAFE,
            "Chrome media and service worker cache",
        ),
        literals(
            "Chrome Storage",
            &["IndexedDB", "Local Storage", "Session Storage"],
            "Browser",
            Caution,
            "Chrome local storage (safe if not important)",
        ),
        literals(
            "Firefox Cache",
            &["cache2", "startupCache", "shader-cache"],
            "Browser",
            SAFE,
            "Firefox browser cache",
        ),
        literals(
            "Firefox Offline Cache",
            &["OfflineCache"],
            "Browser",
            SAFE,
            "Firefox offline cache",
        ),
        regexes(
            "Safari Cache",
            &[r"com\.apple\.Safari.*"],
            "Browser",
            SAFE,
            "Safari browser cache",
        ),
        regexes("WebKit Cache", &[r"com\.apple\.WebKit.*"], "Browser", SAFE, "WebKit cache"),
    ]
    .concat()
}

/// 桌面应用缓存
pub fn app_patterns() -> Vec<Pattern> {
    [
        literals(
            "VS Code Cache",
            &["CachedData", "CachedExtensions", "CachedExtensionVSIXs"],
            "App",
            SAFE,
            "VS Code cached data",
        ),
        literals("VS Code Crashpad", &["Crashpad"], "App", SAFE, "VS Code crash reports"),
        regexes("JetBrains Caches", &[r"^caches$"], "App", SAFE, "JetBrains IDE caches")
            .into_iter()
            .map(|p| p.requires(Requirement::ParentContainsAny(vec!["options".to_string()])))
            .collect(),
        literals(
            "JetBrains Local History",
            &["LocalHistory"],
            "App",
            Caution,
            "JetBrains local history",
        ),
        literals("Docker buildx cache", &["buildx"], "App", Caution, "Docker buildx cache"),
        literals(
            "Electron GPU Cache",
            &["GPUCache", "gpu-process-preferences"],
            "App",
            SAFE,
            "Electron GPU cache",
        ),
        literals("Electron Blob Storage", &["blob_storage"], "App", SAFE, "Electron blob storage"),
        regexes(
            "Teams Cache",
            &["^Teams$", "^microsoft-teams$"],
            "App",
            SAFE,
            "Microsoft Teams cache",
        ),
        regexes("Slack Cache", &["^[Ss]lack$"], "App", SAFE, "Slack cache"),
        regexes("Discord Cache", &["^[Dd]iscord$"], "App", SAFE, "Discord cache"),
        regexes("Zoom Cache", &["^[Zz]oom$", r"^zoom\.us$"], "App", SAFE, "Zoom cache"),
        regexes("Spotify Cache", &["^spotify$", "^Spotify$"], "App", SAFE, "Spotify cache"),
    ]
    .concat()
}

/// 系统级缓存（缩略图、字体、着色器）
pub fn system_cache_patterns() -> Vec<Pattern> {
    [
        literals("Thumbnails", &["thumbnails", "Thumbnails"], "System", SAFE, "Thumbnail cache"),
        literals("Font Cache", &["fontconfig"], "System", SAFE, "Font cache"),
        literals(
            "Mesa Shader Cache",
            &["mesa_shader_cache", "mesa_shader_cache_db"],
            "System",
            SAFE,
            "Mesa shader cache",
        ),
        literals(
            "NVIDIA Cache",
            &["nvidia", "GLCache", "ComputeCache"],
            "System",
            SAFE,
            "NVIDIA shader cache",
        ),
        literals("AMD Cache", &["AMD", "VkCache"], "System", SAFE, "AMD shader cache"),
    ]
    .concat()
}

/// 包管理器缓存，分类即包管理器名称
pub fn package_manager_patterns() -> Vec<Pattern> {
    [
        literals("npm cache", &["_cacache", "_npx", "_logs"], "npm", SAFE, "npm cache"),
        literals("yarn cache", &["yarn"], "yarn", SAFE, "Yarn cache"),
        regexes("yarn cache", &["v[0-9]+-tmp"], "yarn", SAFE, "Yarn cache"),
        literals(
            "pnpm store",
            &["pnpm-store", "pnpm"],
            "pnpm",
            SAFE,
            "pnpm content-addressable store",
        ),
        literals("pip cache", &["pip", "wheels"], "pip", SAFE, "pip cache"),
        regexes("pip cache", &["^http-v[0-9]+$"], "pip", SAFE, "pip HTTP cache"),
        literals("pipx cache", &["pipx"], "pip", SAFE, "pipx cache"),
        vec![Pattern::literal("Cargo registry", "registry", "cargo")
            .describe("Cargo registry cache")
            .requires(Requirement::ParentNamed(".cargo".to_string()))],
        literals("Cargo git", &["checkouts"], "cargo", SAFE, "Cargo git checkouts"),
        regexes("Cargo git", &["^db$"], "cargo", SAFE, "Cargo git database")
            .into_iter()
            .map(|p| p.requires(Requirement::ParentNamed("git".to_string())))
            .collect(),
        literals("Go build cache", &["go-build"], "go", SAFE, "Go build cache"),
        regexes("Go mod cache", &["^mod$"], "go", SAFE, "Go module cache"),
        regexes("Gradle caches", &["^caches$"], "gradle", SAFE, "Gradle caches")
            .into_iter()
            .map(|p| p.requires(Requirement::ParentNamed(".gradle".to_string())))
            .collect(),
        literals("Gradle caches", &["modules-2", "build-cache-1"], "gradle", SAFE, "Gradle caches"),
        vec![Pattern::literal("Maven repository", "repository", "maven")
            .describe("Maven local repository (.m2/repository)")
            .requires(Requirement::ParentNamed(".m2".to_string()))],
        literals("Composer cache", &["composer"], "composer", SAFE, "Composer cache"),
        literals("NuGet cache", &["nuget", "NuGet"], "nuget", SAFE, "NuGet cache"),
        literals("Bundler cache", &["bundler"], "bundler", SAFE, "Bundler cache"),
    ]
    .concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PatternCatalog;
    use std::path::Path;

    #[test]
    fn test_builtin_catalogs_compile() {
        for patterns in [
            bloat_patterns(),
            browser_patterns(),
            app_patterns(),
            system_cache_patterns(),
            package_manager_patterns(),
        ] {
            assert!(PatternCatalog::new(patterns, true).is_ok());
        }
    }

    #[test]
    fn test_bloat_catalog_common_hits() {
        let catalog = PatternCatalog::new(bloat_patterns(), true).unwrap();

        let hit = catalog.match_path(Path::new("/code/app/node_modules")).unwrap();
        assert_eq!(hit.category, "Node.js");

        let hit = catalog.match_path(Path::new("/code/app/__pycache__")).unwrap();
        assert_eq!(hit.category, "Python");

        let hit = catalog.match_path(Path::new("/code/app/.git")).unwrap();
        assert_eq!(hit.safety_level, SafetyLevel::ProtectedExempt);

        assert!(catalog.match_path(Path::new("/code/app/notes.txt.bak")).is_some());
        assert!(catalog.match_path(Path::new("/code/app/src")).is_none());
    }

    #[test]
    fn test_logs_not_matched_under_var() {
        let catalog = PatternCatalog::new(bloat_patterns(), true).unwrap();

        assert!(catalog.match_path(Path::new("/var/log")).is_none());
        assert!(catalog.match_path(Path::new("/var/www/site/logs")).is_none());
        assert_eq!(catalog.match_path(Path::new("/code/app/logs")).unwrap().name, "logs");
    }

    #[test]
    fn test_maven_repository_needs_m2_parent() {
        let catalog = PatternCatalog::new(package_manager_patterns(), true).unwrap();

        let hit = catalog.match_path(Path::new("/home/u/.m2/repository")).unwrap();
        assert_eq!(hit.category, "maven");
        assert!(catalog.match_path(Path::new("/home/u/work/repository")).is_none());
    }
}
