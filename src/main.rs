mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bloat_hunter::config::{Config, DefaultConfig, CONFIG_TEMPLATE};
use bloat_hunter::error::{FsError, ScanError};
use bloat_hunter::models::{DuplicateReport, KeepStrategy, ScanReport, TruncationNotice};
use bloat_hunter::operations::{
    export_duplicates, export_targets, Cleaner, CleanupItem, CleanupOptions, ExportFormat,
};
use bloat_hunter::platform::PlatformInfo;
use bloat_hunter::safety::SafetyGate;
use bloat_hunter::scanner::aggregator::DEFAULT_LIMIT;
use bloat_hunter::scanner::profiles::PACKAGE_MANAGERS;
use bloat_hunter::scanner::worker_pool::MAX_WORKERS;
use bloat_hunter::scanner::{
    aggregate_duplicates, aggregate_targets, AggregateOptions, CancelToken, DuplicateDetector,
    ParallelConfig, ScanPlan, WorkerPool,
};
use bloat_hunter::utils::{format_size, parse_size};

use cli::{Cli, CommonArgs, Commands, ConfigAction};

/// 完成但记录了软错误
const EXIT_SOFT_ERRORS: u8 = 2;

/// 被 Ctrl-C 中断
const EXIT_CANCELLED: u8 = 130;

/// 命令执行结果
enum Outcome {
    Clean,
    SoftErrors,
}

impl Outcome {
    fn from_errors(has_errors: bool) -> Self {
        if has_errors {
            Outcome::SoftErrors
        } else {
            Outcome::Clean
        }
    }
}

/// 一次命令执行共用的上下文
struct Session {
    config: Config,
    platform: PlatformInfo,
    gate: SafetyGate,
    cancel: CancelToken,

    /// 正在等待用户输入，此时 Ctrl-C 直接退出
    prompting: Arc<AtomicBool>,
    show_progress: bool,
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::SoftErrors) => ExitCode::from(EXIT_SOFT_ERRORS),
        Err(e) if is_cancelled(&e) => {
            eprintln!("操作已取消");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ScanError>()
        .map(|e| e.is_cancelled())
        .unwrap_or(false)
}

fn run(cli: Cli) -> Result<Outcome> {
    // 不依赖配置内容的命令先处理，避免损坏的配置文件阻止 init
    match &cli.command {
        Commands::Config { action: ConfigAction::Init { force } } => return config_init(*force),
        Commands::Config { action: ConfigAction::Path } => return config_path(),
        _ => {}
    }

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };

    let platform = PlatformInfo::detect();
    tracing::debug!("平台: {} ({})", platform.name, platform.variant);

    let cancel = CancelToken::new();
    let prompting = Arc::new(AtomicBool::new(false));
    let handler_token = cancel.clone();
    let handler_prompting = prompting.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_token.cancel();
        // 阻塞在 read_line 上时无法检查取消标志
        if handler_prompting.load(Ordering::SeqCst) {
            eprintln!("\n已取消");
            std::process::exit(i32::from(EXIT_CANCELLED));
        }
    }) {
        tracing::warn!("无法注册 Ctrl-C 处理: {}", e);
    }

    let session = Session {
        gate: SafetyGate::new(platform.safety_policy()),
        config,
        platform,
        cancel,
        prompting,
        show_progress: !cli.no_progress,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Scan { path, deep, common } => run_scan(&session, path, deep, &common),
        Commands::Caches {
            no_browsers,
            no_packages,
            no_apps,
            no_wsl_windows,
            common,
        } => {
            let mut selection = session.config.cache_selection();
            selection.browsers &= !no_browsers;
            selection.package_managers &= !no_packages;
            selection.apps &= !no_apps;
            selection.wsl_windows &= !no_wsl_windows;

            let plan = ScanPlan::system_caches(&session.platform, selection)?;
            run_cache_plan(&session, plan, "caches", "缓存扫描结果", &common)
        }
        Commands::Packages { skip, common } => {
            for name in &skip {
                if !PACKAGE_MANAGERS.contains(&name.as_str()) {
                    tracing::warn!("未知的包管理器: {} (可选: {})", name, PACKAGE_MANAGERS.join(", "));
                }
            }
            let enabled: Vec<String> = session
                .config
                .packages
                .enabled()
                .into_iter()
                .filter(|name| !skip.contains(name))
                .collect();

            let roots = session.platform.package_cache_roots();
            let plan = ScanPlan::package_caches(&session.platform, &enabled, roots)?;
            run_cache_plan(&session, plan, "packages", "包管理器缓存", &common)
        }
        Commands::Duplicates { path, keep, common } => {
            run_duplicates(&session, path, keep, &common)
        }
        Commands::Info => {
            print_info(&session);
            Ok(Outcome::Clean)
        }
        Commands::Config { action: ConfigAction::Show } => {
            if session.config.sources.is_empty() {
                println!("# 未找到配置文件，使用内置默认值");
            }
            for source in &session.config.sources {
                println!("# 来源: {}", source.display());
            }
            print!("{}", session.config.to_toml_string()?);
            Ok(Outcome::Clean)
        }
        Commands::Config { .. } => Ok(Outcome::Clean),
    }
}

fn run_scan(session: &Session, path: PathBuf, deep: bool, common: &CommonArgs) -> Result<Outcome> {
    let config = &session.config;
    let min_size = resolve_size(common.min_size.as_deref(), config.scan_min_size()?)?;
    let root = path.canonicalize().unwrap_or(path);

    let plan = ScanPlan::bloat(
        root,
        deep || config.scan.deep,
        &config.pattern_overrides(),
        session.platform.case_sensitive,
    )?;
    let pool = build_pool(session, common)?;
    let outcome = plan.run(&session.gate, &pool, session.show_progress)?;

    let options = aggregate_options(session, common, min_size);
    let report = aggregate_targets(&plan.roots, &outcome, &options);
    print_targets(&report, "扫描结果");
    finish_targets(session, &report, "scan", None, common)
}

fn run_cache_plan(
    session: &Session,
    plan: ScanPlan,
    kind: &str,
    title: &str,
    common: &CommonArgs,
) -> Result<Outcome> {
    if plan.roots.is_empty() {
        println!("未找到可扫描的缓存目录");
        return Ok(Outcome::Clean);
    }

    let min_size = resolve_size(common.min_size.as_deref(), session.config.scan_min_size()?)?;
    let pool = build_pool(session, common)?;
    let outcome = plan.run(&session.gate, &pool, session.show_progress)?;

    let options = aggregate_options(session, common, min_size);
    let report = aggregate_targets(&plan.roots, &outcome, &options);
    print_targets(&report, title);
    finish_targets(session, &report, kind, Some(&session.platform), common)
}

fn run_duplicates(
    session: &Session,
    path: PathBuf,
    keep: Option<String>,
    common: &CommonArgs,
) -> Result<Outcome> {
    let config = &session.config;
    let min_size = resolve_size(common.min_size.as_deref(), config.duplicate_min_size()?)?;
    let keep: KeepStrategy = match keep {
        Some(value) => value.parse()?,
        None => config.keep_strategy()?,
    };
    let roots = vec![path.canonicalize().unwrap_or(path)];

    let pool = build_pool(session, common)?;
    let outcome = DuplicateDetector::new(&session.gate, &pool)
        .with_progress(session.show_progress)
        .find_duplicates(&roots, min_size)?;

    let options = aggregate_options(session, common, min_size);
    let report = aggregate_duplicates(&roots, &outcome, &options);
    print_duplicates(&report, keep, session.verbose);

    if let Some(export) = &common.export {
        let format = common.format.unwrap_or_else(|| ExportFormat::from_path(export));
        export_duplicates(&report, keep, format, export)?;
        println!("已导出到 {}", export.display());
    }

    let mut failed = false;
    if common.clean {
        let items = CleanupItem::from_duplicates(report.visible_groups(), keep);
        failed = clean_items(session, &items, common)?;
    }

    Ok(Outcome::from_errors(report.has_errors() || failed))
}

/// 导出与清理，目标类扫描共用
fn finish_targets(
    session: &Session,
    report: &ScanReport,
    kind: &str,
    platform: Option<&PlatformInfo>,
    common: &CommonArgs,
) -> Result<Outcome> {
    if session.verbose {
        print_error_details(&report.result.errors);
    }

    if let Some(export) = &common.export {
        let format = common.format.unwrap_or_else(|| ExportFormat::from_path(export));
        export_targets(report, kind, platform, format, export)?;
        println!("已导出到 {}", export.display());
    }

    let mut failed = false;
    if common.clean {
        let items: Vec<CleanupItem> = report
            .visible_targets()
            .iter()
            .map(CleanupItem::from_target)
            .collect();
        failed = clean_items(session, &items, common)?;
    }

    Ok(Outcome::from_errors(report.result.has_errors() || failed))
}

fn resolve_size(flag: Option<&str>, fallback: u64) -> Result<u64> {
    match flag {
        Some(value) => Ok(parse_size(value)?),
        None => Ok(fallback),
    }
}

fn aggregate_options(session: &Session, common: &CommonArgs, min_size: u64) -> AggregateOptions {
    AggregateOptions {
        min_size,
        show_all: common.all || session.config.scan.show_all,
        limit: DEFAULT_LIMIT,
    }
}

fn build_pool(session: &Session, common: &CommonArgs) -> Result<WorkerPool> {
    let mut parallel = session.config.parallel_config();

    if let Some(workers) = common.workers {
        if workers == 0 || workers > MAX_WORKERS {
            bail!("工作线程数 {} 超出范围 1..={}", workers, MAX_WORKERS);
        }
        parallel = ParallelConfig::with_workers(workers);
    }
    if common.no_parallel {
        parallel = ParallelConfig::sequential();
    }

    let pool = WorkerPool::new(&parallel, session.cancel.clone());
    tracing::debug!("工作线程数: {}", pool.workers());
    Ok(pool)
}

/// 确认后删除；返回是否有删除失败
fn clean_items(session: &Session, items: &[CleanupItem], common: &CommonArgs) -> Result<bool> {
    if items.is_empty() {
        println!("没有需要清理的条目");
        return Ok(false);
    }

    let defaults = &session.config.defaults;
    let options = CleanupOptions {
        dry_run: common.dry_run || defaults.dry_run,
        use_trash: defaults.trash && !common.no_trash,
    };
    let total: u64 = items.iter().map(|item| item.size_bytes).sum();

    session.cancel.check()?;
    if !options.dry_run && !common.yes && defaults.interactive {
        let action = if options.use_trash { "移到回收站" } else { "永久删除" };
        let question = format!("确认{} {} 项，共 {}？", action, items.len(), format_size(total));
        let confirmed = confirm(session, &question)?;
        session.cancel.check()?;
        if !confirmed {
            println!("已取消清理");
            return Ok(false);
        }
    }

    let report = Cleaner::new(&session.gate, options).clean(items, &session.cancel)?;

    if report.dry_run {
        println!("\n[预览] 将删除 {} 项，释放 {}", report.removed.len(), format_size(report.freed_bytes));
        for path in &report.removed {
            println!("  {}", path.display());
        }
    } else {
        println!("\n已删除 {} 项，释放 {}", report.removed.len(), format_size(report.freed_bytes));
    }
    for skipped in &report.skipped {
        println!("  跳过 {}: {}", skipped.path.display(), skipped.reason);
    }
    for failure in &report.failures {
        println!("  失败 {}: {}", failure.path.display(), failure.message);
    }

    Ok(report.has_failures())
}

fn confirm(session: &Session, question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    session.prompting.store(true, Ordering::SeqCst);
    if session.cancel.is_cancelled() {
        session.prompting.store(false, Ordering::SeqCst);
        return Err(ScanError::Cancelled.into());
    }
    let read = io::stdin().lock().read_line(&mut answer);
    session.prompting.store(false, Ordering::SeqCst);
    read?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_targets(report: &ScanReport, title: &str) {
    let result = &report.result;
    println!("\n{}", title);

    if result.targets.is_empty() {
        println!("没有找到可清理的条目");
    } else {
        println!("{:>4}  {:>10}  {:>8}  {:<16} 路径", "#", "大小", "文件数", "分类");
        for (i, target) in report.visible_targets().iter().enumerate() {
            println!(
                "{:>4}  {:>10}  {:>8}  {:<16} {}",
                i + 1,
                format_size(target.size_bytes),
                target.file_count,
                target.category,
                target.path.display()
            );
        }

        println!("\n按分类:");
        for total in result.category_totals() {
            println!(
                "  {:<16} {:>10}  ({} 项)",
                total.category,
                format_size(total.size_bytes),
                total.target_count
            );
        }
        println!("\n共 {} 项，可回收 {}", result.targets.len(), result.total_size_display());
    }

    print_notices(report.truncation, result.errors.len());
}

fn print_duplicates(report: &DuplicateReport, keep: KeepStrategy, verbose: bool) {
    println!("\n重复文件（保留策略: {}）", keep);

    if report.groups.is_empty() {
        println!("没有找到重复文件（比较了 {} 个文件）", report.files_scanned);
    } else {
        for (i, group) in report.visible_groups().iter().enumerate() {
            println!(
                "\n#{} {} x {}，浪费 {}",
                i + 1,
                format_size(group.size_bytes()),
                group.files().len(),
                format_size(group.wasted_bytes())
            );
            let kept = &group.keep_file(keep).path;
            for file in group.files() {
                let mark = if &file.path == kept { "保留" } else { "删除" };
                println!("  [{}] {}", mark, file.path.display());
            }
        }
        println!(
            "\n共 {} 组，{} 个多余副本，可回收 {}（比较了 {} 个文件）",
            report.groups.len(),
            report.total_duplicates(),
            report.total_wasted_display(),
            report.files_scanned
        );
    }

    print_notices(report.truncation, report.errors.len());
    if verbose {
        print_error_details(&report.errors);
    }
}

fn print_notices(truncation: Option<TruncationNotice>, error_count: usize) {
    if let Some(notice) = truncation {
        println!("仅显示前 {} 项，共 {} 项（使用 --all 显示全部）", notice.shown, notice.total);
    }
    if error_count > 0 {
        println!("{} 个错误（使用 --verbose 查看详情）", error_count);
    }
}

fn print_error_details(errors: &[FsError]) {
    for err in errors {
        println!("  {}: {}", err.path.display(), err.message);
    }
}

fn print_info(session: &Session) {
    let platform = &session.platform;
    println!("平台: {}", platform.name);
    println!("版本: {}", platform.variant);
    println!("用户目录: {}", platform.home_dir.display());
    if platform.is_wsl {
        println!("WSL: {}", platform.wsl_distro.as_deref().unwrap_or("Unknown"));
        if let Some(windows_home) = &platform.windows_home {
            println!("Windows 用户目录: {}", windows_home.display());
        }
    }
    println!("区分大小写: {}", if platform.case_sensitive { "是" } else { "否" });
    println!("工作线程: {}", session.config.parallel_config().effective_workers());

    let roots = platform.cache_roots();
    println!("\n缓存目录 ({}):", roots.len());
    for root in roots {
        println!("  {:<18} {}", root.kind.as_str(), root.path.display());
    }
}

fn config_init(force: bool) -> Result<Outcome> {
    let (base, _) = Config::config_paths();
    let path = base.context("无法确定配置目录")?;

    if path.exists() && !force {
        bail!("配置文件已存在: {} (使用 --force 覆盖)", path.display());
    }
    write_template(&path)?;
    println!("已写入配置模板: {}", path.display());
    Ok(Outcome::Clean)
}

fn write_template(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, CONFIG_TEMPLATE).with_context(|| format!("无法写入 {}", path.display()))?;
    Ok(())
}

fn config_path() -> Result<Outcome> {
    let (base, local) = Config::config_paths();
    let status = |p: &Path| if p.is_file() { "存在" } else { "不存在" };

    match base {
        Some(base) => println!("基础配置: {} ({})", base.display(), status(&base)),
        None => println!("基础配置: 无法确定配置目录"),
    }
    println!(
        "本地覆盖: {} ({})，文件名 {}",
        local.display(),
        status(&local),
        DefaultConfig::local_override_name()
    );
    Ok(Outcome::Clean)
}
