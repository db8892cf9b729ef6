use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{FsError, ScanError};
use crate::models::{Candidate, Target};
use crate::patterns::{PatternCatalog, SafetyLevel};
use crate::safety::SafetyGate;
use crate::scanner::size_calculator::measure_path;
use crate::scanner::{CancelToken, WorkerPool};
use crate::utils::progress;

/// 第一阶段遍历选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// 最多向下进入的目录层数（根目录的子项为第 0 层）
    pub max_depth: usize,

    /// 根目录本身是否参与匹配
    pub match_root: bool,
}

impl WalkOptions {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            match_root: false,
        }
    }

    pub fn matching_root(mut self) -> Self {
        self.match_root = true;
        self
    }
}

/// 一次目标扫描的原始结果（未排序、未过滤）
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// 按发现顺序排列
    pub targets: Vec<Target>,

    pub errors: Vec<FsError>,
}

/// 第一阶段：顺序遍历，收集匹配且未受保护的候选项
///
/// 命中模式的目录不再向下遍历；命中但受保护的路径不会被记录。
/// 同一路径只记录一次，先匹配者胜出。
#[allow(clippy::too_many_arguments)]
pub fn collect_candidates(
    root: &Path,
    catalog: &PatternCatalog,
    gate: &SafetyGate,
    options: WalkOptions,
    cancel: &CancelToken,
    seen: &mut HashSet<PathBuf>,
    candidates: &mut Vec<Candidate>,
    errors: &mut Vec<FsError>,
) -> Result<(), ScanError> {
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .max_depth(options.max_depth + 1)
        .into_iter();

    while let Some(entry) = walker.next() {
        cancel.check()?;

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let error = FsError::from_walk(&err, root);
                tracing::warn!("无法访问 {}: {}", error.path.display(), error.message);
                errors.push(error);
                continue;
            }
        };

        let path = entry.path();
        let is_dir = entry.file_type().is_dir();

        if is_dir && gate.blocks_traversal(path) {
            tracing::debug!("跳过受保护目录: {}", path.display());
            walker.skip_current_dir();
            continue;
        }

        if entry.depth() == 0 && !options.match_root {
            continue;
        }

        let pattern = match catalog.match_path(path) {
            Some(pattern) => pattern,
            None => continue,
        };

        if is_dir {
            walker.skip_current_dir();
        }

        if pattern.safety_level == SafetyLevel::ProtectedExempt {
            continue;
        }

        if gate.is_protected(path) {
            tracing::debug!("匹配 '{}' 但路径受保护: {}", pattern.name, path.display());
            continue;
        }

        if seen.insert(path.to_path_buf()) {
            candidates.push(Candidate::new(path.to_path_buf(), pattern, is_dir));
        }
    }

    Ok(())
}

/// 两阶段目标扫描器
///
/// 模式目录与安全闸门由调用方注入，扫描器本身不持有任何状态。
pub struct TargetScanner<'a> {
    catalog: &'a PatternCatalog,
    gate: &'a SafetyGate,
    pool: &'a WorkerPool,
    show_progress: bool,
}

impl<'a> TargetScanner<'a> {
    pub fn new(catalog: &'a PatternCatalog, gate: &'a SafetyGate, pool: &'a WorkerPool) -> Self {
        Self {
            catalog,
            gate,
            pool,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// 扫描一组根目录
    pub fn scan(&self, roots: &[PathBuf], options: WalkOptions) -> Result<ScanOutcome, ScanError> {
        let cancel = self.pool.cancel_token();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut errors = Vec::new();

        let spinner = progress::spinner(self.show_progress, "正在查找可清理的目录...");
        for root in roots {
            spinner.set_message(format!("扫描: {}", root.display()));
            collect_candidates(
                root,
                self.catalog,
                self.gate,
                options,
                cancel,
                &mut seen,
                &mut candidates,
                &mut errors,
            )?;
        }
        spinner.finish_and_clear();

        tracing::info!("发现 {} 个候选项，开始计算大小", candidates.len());

        let bar = progress::bar(self.show_progress, candidates.len() as u64, "计算大小");
        let output = self.pool.run_ordered(&candidates, |candidate| {
            let size = measure_path(&candidate.path, cancel);
            bar.inc(1);
            size
        })?;
        bar.finish_and_clear();

        for (index, error) in &output.errors {
            let entry = error
                .to_fs_error()
                .unwrap_or_else(|| FsError::new(&candidates[*index].path, error.to_string()));
            tracing::warn!("计算大小失败 {}: {}", entry.path.display(), entry.message);
            errors.push(entry);
        }

        let mut targets = Vec::with_capacity(candidates.len());
        for (candidate, size) in candidates.into_iter().zip(output.results) {
            let size = size.unwrap_or_default();
            errors.extend(size.errors);
            targets.push(candidate.into_target(size.size_bytes, size.file_count));
        }

        Ok(ScanOutcome { targets, errors })
    }
}
