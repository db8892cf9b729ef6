use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use bloat_hunter::operations::ExportFormat;

#[derive(Parser)]
#[command(name = "bloat-hunter")]
#[command(about = "查找并清理可回收的磁盘空间：构建产物、缓存和重复文件")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径（只加载该文件）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 不显示进度条
    #[arg(long, global = true)]
    pub no_progress: bool,
}

/// 各扫描命令共用的选项
#[derive(Args, Clone, Debug, Default)]
pub struct CommonArgs {
    /// 最小大小，例如 10MB
    #[arg(short, long)]
    pub min_size: Option<String>,

    /// 关闭并行，单线程扫描
    #[arg(long)]
    pub no_parallel: bool,

    /// 工作线程数（1-32）
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// 显示全部结果
    #[arg(short, long)]
    pub all: bool,

    /// 导出结果到文件
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// 导出格式，默认按扩展名推断
    #[arg(short, long, value_enum)]
    pub format: Option<ExportFormat>,

    /// 扫描后删除找到的条目
    #[arg(long)]
    pub clean: bool,

    /// 只预览删除，不实际执行
    #[arg(long)]
    pub dry_run: bool,

    /// 删除前不询问确认
    #[arg(short, long)]
    pub yes: bool,

    /// 永久删除而不是移到回收站
    #[arg(long)]
    pub no_trash: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 扫描目录中的构建产物、依赖和临时文件
    Scan {
        /// 要扫描的目录
        #[arg(default_value = ".")]
        path: PathBuf,

        /// 深度扫描（更慢，更彻底）
        #[arg(short, long)]
        deep: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// 扫描系统、浏览器和应用缓存
    Caches {
        /// 不扫描浏览器缓存
        #[arg(long)]
        no_browsers: bool,

        /// 不扫描包管理器缓存
        #[arg(long)]
        no_packages: bool,

        /// 不扫描应用缓存
        #[arg(long)]
        no_apps: bool,

        /// WSL 下不扫描 Windows 一侧
        #[arg(long)]
        no_wsl_windows: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// 扫描包管理器缓存
    Packages {
        /// 跳过的包管理器，逗号分隔，例如 npm,pip
        #[arg(long, value_delimiter = ',')]
        skip: Vec<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// 查找内容相同的重复文件
    Duplicates {
        /// 要扫描的目录
        #[arg(default_value = ".")]
        path: PathBuf,

        /// 保留策略：first、shortest、oldest、newest
        #[arg(short, long)]
        keep: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// 显示平台信息和缓存目录
    Info,

    /// 管理配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// 在配置目录写入配置模板
    Init {
        /// 覆盖已存在的配置文件
        #[arg(long)]
        force: bool,
    },

    /// 显示当前生效的配置
    Show,

    /// 显示配置文件查找路径
    Path,
}
