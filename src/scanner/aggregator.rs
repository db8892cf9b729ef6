use std::path::PathBuf;

use crate::models::{DuplicateReport, ScanReport, ScanResult, Target, TruncationNotice};
use crate::scanner::{DuplicateOutcome, ScanOutcome};

/// 默认显示的条目数
pub const DEFAULT_LIMIT: usize = 20;

/// 汇总选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// 小于该值的目标被丢弃
    pub min_size: u64,

    /// 显示全部条目（不截断）
    pub show_all: bool,

    /// 截断时保留的条目数
    pub limit: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            min_size: 0,
            show_all: false,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl AggregateOptions {
    fn truncation(&self, total: usize) -> Option<TruncationNotice> {
        if self.show_all || total <= self.limit {
            None
        } else {
            Some(TruncationNotice {
                shown: self.limit,
                total,
            })
        }
    }
}

/// 过滤并排序目标：大小为 0 或小于 `min_size` 的被丢弃，按大小降序、路径升序
pub fn rank_targets(targets: &[Target], min_size: u64) -> ScanResult {
    let mut ranked: Vec<Target> = targets
        .iter()
        .filter(|t| t.size_bytes > 0 && t.size_bytes >= min_size)
        .cloned()
        .collect();
    ranked.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.path.cmp(&b.path)));

    ScanResult {
        total_size: ranked.iter().map(|t| t.size_bytes).sum(),
        targets: ranked,
        errors: Vec::new(),
    }
}

/// 生成目标扫描报告
pub fn aggregate_targets(
    roots: &[PathBuf],
    outcome: &ScanOutcome,
    options: &AggregateOptions,
) -> ScanReport {
    let mut result = rank_targets(&outcome.targets, options.min_size);
    result.errors = outcome.errors.clone();

    ScanReport {
        scanned_paths: roots.to_vec(),
        truncation: options.truncation(result.targets.len()),
        result,
    }
}

/// 生成重复文件报告：按浪费空间降序、首个路径升序
pub fn aggregate_duplicates(
    roots: &[PathBuf],
    outcome: &DuplicateOutcome,
    options: &AggregateOptions,
) -> DuplicateReport {
    let mut groups = outcome.groups.clone();
    groups.sort_by(|a, b| {
        b.wasted_bytes()
            .cmp(&a.wasted_bytes())
            .then_with(|| a.files()[0].path.cmp(&b.files()[0].path))
    });

    DuplicateReport {
        scanned_paths: roots.to_vec(),
        total_wasted: groups.iter().map(|g| g.wasted_bytes()).sum(),
        files_scanned: outcome.files_scanned,
        errors: outcome.errors.clone(),
        truncation: options.truncation(groups.len()),
        groups,
    }
}
