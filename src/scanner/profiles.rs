//! 扫描方案：同一个目标扫描器，配不同的模式目录、根目录和深度

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::ScanError;
use crate::patterns::{builtin, Pattern, PatternCatalog};
use crate::platform::detect::is_windows_mount;
use crate::platform::{CacheRootKind, PlatformInfo};
use crate::safety::SafetyGate;
use crate::scanner::{ScanOutcome, TargetScanner, WalkOptions, WorkerPool};

/// 项目目录扫描的默认深度
pub const BLOAT_DEPTH: usize = 5;

/// 深度扫描的深度
pub const DEEP_DEPTH: usize = 10;

/// 缓存目录扫描的深度
pub const CACHE_DEPTH: usize = 3;

/// 全部包管理器名称（即包管理器模式的分类）
pub const PACKAGE_MANAGERS: &[&str] = &[
    "npm", "yarn", "pnpm", "pip", "cargo", "go", "gradle", "maven", "composer", "nuget", "bundler",
];

/// 用户对内置模式的调整
#[derive(Debug, Clone, Default)]
pub struct PatternOverrides {
    /// 按名称禁用的内置模式
    pub disabled: Vec<String>,

    /// 追加的模式
    pub extra: Vec<Pattern>,
}

impl PatternOverrides {
    pub fn apply(&self, patterns: Vec<Pattern>) -> Vec<Pattern> {
        let disabled: HashSet<&str> = self.disabled.iter().map(|s| s.as_str()).collect();
        patterns
            .into_iter()
            .filter(|p| !disabled.contains(p.name.as_str()))
            .chain(self.extra.iter().cloned())
            .collect()
    }
}

/// 系统缓存扫描包含的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSelection {
    pub browsers: bool,
    pub package_managers: bool,
    pub apps: bool,

    /// WSL 下是否扫描 Windows 一侧（/mnt/...）
    pub wsl_windows: bool,
}

impl Default for CacheSelection {
    fn default() -> Self {
        Self {
            browsers: true,
            package_managers: true,
            apps: true,
            wsl_windows: true,
        }
    }
}

/// 一次扫描需要的全部输入
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub catalog: PatternCatalog,
    pub roots: Vec<PathBuf>,
    pub options: WalkOptions,
}

impl ScanPlan {
    /// 项目垃圾扫描
    pub fn bloat(
        root: PathBuf,
        deep: bool,
        overrides: &PatternOverrides,
        case_sensitive: bool,
    ) -> Result<Self, ScanError> {
        let depth = if deep { DEEP_DEPTH } else { BLOAT_DEPTH };
        Ok(Self {
            catalog: PatternCatalog::new(
                overrides.apply(builtin::bloat_patterns()),
                case_sensitive,
            )?,
            roots: vec![root],
            options: WalkOptions::new(depth),
        })
    }

    /// 系统缓存扫描
    pub fn system_caches(
        platform: &PlatformInfo,
        selection: CacheSelection,
    ) -> Result<Self, ScanError> {
        let mut patterns = builtin::system_cache_patterns();
        if selection.browsers {
            patterns.extend(builtin::browser_patterns());
        }
        if selection.apps {
            patterns.extend(builtin::app_patterns());
        }
        if selection.package_managers {
            patterns.extend(builtin::package_manager_patterns());
        }

        let roots = platform
            .cache_roots()
            .into_iter()
            .filter(|root| match root.kind {
                CacheRootKind::System => true,
                CacheRootKind::Browser => selection.browsers,
                CacheRootKind::PackageManagers => selection.package_managers,
                CacheRootKind::Apps => selection.apps,
            })
            .map(|root| root.path)
            .filter(|path| !platform.is_wsl || selection.wsl_windows || !is_windows_mount(path))
            .collect();

        Ok(Self {
            catalog: PatternCatalog::new(patterns, platform.case_sensitive)?,
            roots,
            options: WalkOptions::new(CACHE_DEPTH).matching_root(),
        })
    }

    /// 包管理器缓存扫描，`enabled` 中没有的包管理器被跳过
    pub fn package_caches(
        platform: &PlatformInfo,
        enabled: &[String],
        roots: Vec<PathBuf>,
    ) -> Result<Self, ScanError> {
        let patterns = package_patterns(enabled);
        Ok(Self {
            catalog: PatternCatalog::new(patterns, platform.case_sensitive)?,
            roots,
            options: WalkOptions::new(CACHE_DEPTH).matching_root(),
        })
    }

    pub fn run(
        &self,
        gate: &SafetyGate,
        pool: &WorkerPool,
        show_progress: bool,
    ) -> Result<ScanOutcome, ScanError> {
        tracing::info!(
            "开始扫描 {} 个根目录，{} 条模式，深度 {}",
            self.roots.len(),
            self.catalog.len(),
            self.options.max_depth
        );
        TargetScanner::new(&self.catalog, gate, pool)
            .with_progress(show_progress)
            .scan(&self.roots, self.options)
    }
}

/// 只保留启用的包管理器的模式
pub fn package_patterns(enabled: &[String]) -> Vec<Pattern> {
    builtin::package_manager_patterns()
        .into_iter()
        .filter(|p| enabled.iter().any(|name| name == &p.category))
        .collect()
}
