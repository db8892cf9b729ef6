use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::defaults::DefaultConfig;
use crate::error::ScanError;
use crate::models::KeepStrategy;
use crate::patterns::{Pattern, PatternCatalog};
use crate::scanner::profiles::PACKAGE_MANAGERS;
use crate::scanner::worker_pool::{default_workers, MAX_WORKERS};
use crate::scanner::{CacheSelection, ParallelConfig, PatternOverrides};
use crate::utils::parse_size;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 默认行为
    pub defaults: DefaultsConfig,

    /// 包管理器开关
    pub packages: PackagesConfig,

    /// 缓存类别开关
    pub caches: CachesConfig,

    /// 重复检测配置
    pub duplicates: DuplicatesConfig,

    /// 扫描配置
    pub scan: ScanConfig,

    /// 并行配置
    pub parallel: ParallelSettings,

    /// 模式调整
    pub patterns: PatternsConfig,

    /// 实际加载的配置文件
    #[serde(skip)]
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub dry_run: bool,
    pub trash: bool,
    pub interactive: bool,
    pub wsl_windows: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    pub npm: bool,
    pub yarn: bool,
    pub pnpm: bool,
    pub pip: bool,
    pub cargo: bool,
    pub go: bool,
    pub gradle: bool,
    pub maven: bool,
    pub composer: bool,
    pub nuget: bool,
    pub bundler: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachesConfig {
    pub browsers: bool,
    pub package_managers: bool,
    pub apps: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicatesConfig {
    /// 例如 "1MB"
    pub min_size: String,

    /// first / shortest / oldest / newest
    pub keep: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub show_all: bool,
    pub deep: bool,
    pub min_size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelSettings {
    pub enabled: bool,

    /// 未设置时使用 CPU 核心数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    /// 按名称禁用的内置模式
    pub disabled: Vec<String>,

    /// 追加的模式
    pub extra: Vec<Pattern>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            trash: true,
            interactive: true,
            wsl_windows: true,
        }
    }
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            npm: true,
            yarn: true,
            pnpm: true,
            pip: true,
            cargo: true,
            go: true,
            gradle: true,
            maven: true,
            composer: true,
            nuget: true,
            bundler: true,
        }
    }
}

impl PackagesConfig {
    /// 启用的包管理器名称
    pub fn enabled(&self) -> Vec<String> {
        let flags = [
            self.npm,
            self.yarn,
            self.pnpm,
            self.pip,
            self.cargo,
            self.go,
            self.gradle,
            self.maven,
            self.composer,
            self.nuget,
            self.bundler,
        ];
        PACKAGE_MANAGERS
            .iter()
            .zip(flags)
            .filter(|(_, on)| *on)
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

impl Default for CachesConfig {
    fn default() -> Self {
        Self {
            browsers: true,
            package_managers: true,
            apps: true,
        }
    }
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            min_size: DefaultConfig::duplicate_min_size(),
            keep: DefaultConfig::keep_strategy(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            show_all: false,
            deep: false,
            min_size: DefaultConfig::scan_min_size(),
        }
    }
}

impl Default for ParallelSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: None,
        }
    }
}

impl Config {
    /// 配置文件查找路径：(配置目录下的基础文件, 当前目录下的覆盖文件)
    pub fn config_paths() -> (Option<PathBuf>, PathBuf) {
        let base = dirs::config_dir().map(|dir| {
            dir.join("bloat-hunter")
                .join(DefaultConfig::config_file_name())
        });
        let local = env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DefaultConfig::local_override_name());
        (base, local)
    }

    /// 按默认顺序加载配置；文件都不存在时使用内置默认值
    pub fn load() -> Result<Self, ScanError> {
        let (base, local) = Self::config_paths();
        let mut paths: Vec<PathBuf> = base.into_iter().collect();
        paths.push(local);
        Self::load_layered(&paths)
    }

    /// 依次加载存在的文件，后面的覆盖前面的
    pub fn load_layered(paths: &[PathBuf]) -> Result<Self, ScanError> {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut sources = Vec::new();

        for path in paths.iter().filter(|p| p.is_file()) {
            tracing::debug!("加载配置文件: {}", path.display());
            merge_values(&mut merged, read_toml(path)?);
            sources.push(path.clone());
        }

        let mut config: Config = merged
            .try_into()
            .map_err(|e| ScanError::Config(format!("配置格式错误: {}", e)))?;
        config.sources = sources;
        config.validate()?;
        Ok(config)
    }

    /// 只从指定文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self, ScanError> {
        if !path.is_file() {
            return Err(ScanError::Config(format!("配置文件不存在: {}", path.display())));
        }
        Self::load_layered(&[path.to_path_buf()])
    }

    /// 检查所有配置项，一次性报告全部问题
    pub fn validate(&self) -> Result<(), ScanError> {
        let mut problems = Vec::new();

        if let Err(e) = parse_size(&self.duplicates.min_size) {
            problems.push(format!("duplicates.min_size: {}", e));
        }
        if let Err(e) = self.duplicates.keep.parse::<KeepStrategy>() {
            problems.push(format!("duplicates.keep: {}", e));
        }
        if let Err(e) = parse_size(&self.scan.min_size) {
            problems.push(format!("scan.min_size: {}", e));
        }
        if let Some(workers) = self.parallel.workers {
            if workers == 0 || workers > MAX_WORKERS {
                problems.push(format!("parallel.workers: {} 超出范围 1..={}", workers, MAX_WORKERS));
            }
        }
        if let Err(e) = PatternCatalog::new(self.patterns.extra.clone(), true) {
            problems.push(format!("patterns.extra: {}", e));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ScanError::Config(problems.join("; ")))
        }
    }

    pub fn duplicate_min_size(&self) -> Result<u64, ScanError> {
        parse_size(&self.duplicates.min_size)
    }

    pub fn keep_strategy(&self) -> Result<KeepStrategy, ScanError> {
        self.duplicates.keep.parse()
    }

    pub fn scan_min_size(&self) -> Result<u64, ScanError> {
        parse_size(&self.scan.min_size)
    }

    pub fn parallel_config(&self) -> ParallelConfig {
        ParallelConfig {
            enabled: self.parallel.enabled,
            max_workers: self.parallel.workers.unwrap_or_else(default_workers),
        }
    }

    pub fn pattern_overrides(&self) -> PatternOverrides {
        PatternOverrides {
            disabled: self.patterns.disabled.clone(),
            extra: self.patterns.extra.clone(),
        }
    }

    pub fn cache_selection(&self) -> CacheSelection {
        CacheSelection {
            browsers: self.caches.browsers,
            package_managers: self.caches.package_managers,
            apps: self.caches.apps,
            wsl_windows: self.defaults.wsl_windows,
        }
    }

    /// 生效配置的 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, ScanError> {
        toml::to_string_pretty(self).map_err(|e| ScanError::Config(e.to_string()))
    }
}

fn read_toml(path: &Path) -> Result<toml::Value, ScanError> {
    let content = fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
    toml::from_str(&content).map_err(|e| ScanError::Config(format!("{}: {}", path.display(), e)))
}

/// 表格逐层合并，其余类型直接覆盖
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_TEMPLATE;
    use tempfile::tempdir;

    #[test]
    fn test_template_matches_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, CONFIG_TEMPLATE).unwrap();

        let mut config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.sources, vec![path]);
        config.sources.clear();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = Config::load_layered(&[temp_dir.path().join("none.toml")]).unwrap();

        assert!(config.sources.is_empty());
        assert_eq!(config.duplicate_min_size().unwrap(), 1024 * 1024);
        assert_eq!(config.keep_strategy().unwrap(), KeepStrategy::First);
        assert_eq!(config.packages.enabled().len(), PACKAGE_MANAGERS.len());
    }

    #[test]
    fn test_local_file_overrides_base() {
        let temp_dir = tempdir().unwrap();
        let base = temp_dir.path().join("base.toml");
        let local = temp_dir.path().join("bloathunter.toml");
        fs::write(
            &base,
            "[duplicates]\nmin_size = \"10MB\"\nkeep = \"oldest\"\n\n[packages]\nnpm = false\n",
        )
        .unwrap();
        fs::write(&local, "[duplicates]\nkeep = \"newest\"\n\n[parallel]\nworkers = 2\n").unwrap();

        let config = Config::load_layered(&[base.clone(), local.clone()]).unwrap();

        assert_eq!(config.duplicate_min_size().unwrap(), 10 * 1024 * 1024);
        assert_eq!(config.keep_strategy().unwrap(), KeepStrategy::Newest);
        assert!(!config.packages.npm);
        assert!(!config.packages.enabled().contains(&"npm".to_string()));
        assert_eq!(config.parallel_config().effective_workers(), 2);
        assert_eq!(config.sources, vec![base, local]);
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bad.toml");
        fs::write(
            &path,
            "[duplicates]\nmin_size = \"lots\"\nkeep = \"random\"\n\n[parallel]\nworkers = 0\n",
        )
        .unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("duplicates.min_size"));
        assert!(message.contains("duplicates.keep"));
        assert!(message.contains("parallel.workers"));
    }

    #[test]
    fn test_extra_patterns() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("patterns.toml");
        fs::write(
            &path,
            r#"
[patterns]
disabled = ["build"]

[[patterns.extra]]
name = "bazel-out"
kind = "literal"
expression = "bazel-out"
category = "Build"
safety_level = "caution"
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        let overrides = config.pattern_overrides();
        assert_eq!(overrides.disabled, vec!["build".to_string()]);
        assert_eq!(overrides.extra.len(), 1);
        assert_eq!(overrides.extra[0].safety_level, crate::patterns::SafetyLevel::Caution);
    }

    #[test]
    fn test_invalid_extra_pattern_rejected() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("patterns.toml");
        fs::write(
            &path,
            "[[patterns.extra]]\nname = \"bad\"\nkind = \"regex\"\nexpression = \"([\"\ncategory = \"X\"\n",
        )
        .unwrap();

        assert!(matches!(Config::load_from_file(&path), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_show_round_trips() {
        let config = Config::default();
        let text = config.to_toml_string().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_disabled_parallel() {
        let mut config = Config::default();
        config.parallel.enabled = false;
        assert_eq!(config.parallel_config().effective_workers(), 1);
    }
}
