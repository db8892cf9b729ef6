pub struct DefaultConfig;

impl DefaultConfig {
    /// 重复检测的默认最小文件大小
    pub fn duplicate_min_size() -> String {
        "1MB".to_string()
    }

    /// 默认保留策略
    pub fn keep_strategy() -> String {
        "first".to_string()
    }

    /// 目标扫描默认不过滤大小
    pub fn scan_min_size() -> String {
        "0".to_string()
    }

    /// 配置目录下的文件名
    pub fn config_file_name() -> &'static str {
        "config.toml"
    }

    /// 当前目录下的覆盖文件名
    pub fn local_override_name() -> &'static str {
        "bloathunter.toml"
    }
}

/// `config init` 写入的模板
pub const CONFIG_TEMPLATE: &str = r#"# bloat-hunter 配置文件
#
# 查找顺序：<配置目录>/bloat-hunter/config.toml 为基础，
# 当前目录下的 bloathunter.toml 覆盖其中的同名键。

[defaults]
dry_run = false         # 只预览，不删除
trash = true            # 移到回收站而不是永久删除
interactive = true      # 删除前确认
wsl_windows = true      # WSL 下同时扫描 Windows 一侧的缓存

[packages]
# packages 命令扫描的包管理器
npm = true
yarn = true
pnpm = true
pip = true
cargo = true
go = true
gradle = true
maven = true
composer = true
nuget = true
bundler = true

[caches]
# caches 命令扫描的类别
browsers = true         # Chrome、Firefox、Edge、Safari
package_managers = true # npm、pip、cargo 等
apps = true             # VS Code、Slack、Discord 等

[duplicates]
min_size = "1MB"        # 最小文件大小：1KB、10MB、1GB
keep = "first"          # 保留哪一个：first、shortest、oldest、newest

[scan]
show_all = false        # 显示全部结果，而不是前 20 项
deep = false            # 深度扫描（更慢，更彻底）
min_size = "0"          # 小于该大小的目标不显示

[parallel]
enabled = true
# workers = 8           # 默认为 CPU 核心数，最多 32

[patterns]
# 按名称禁用内置模式
disabled = []

# 追加自定义模式
# [[patterns.extra]]
# name = "bazel-out"
# kind = "literal"        # literal、glob、regex
# expression = "bazel-out"
# category = "Build"
# safety_level = "caution"
"#;
