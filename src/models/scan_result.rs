use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::FsError;
use crate::models::{DuplicateGroup, Target};
use crate::utils::format_size;

/// 目标扫描的最终结果
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// 按大小降序排列的目标
    pub targets: Vec<Target>,

    /// 所有目标的总大小
    pub total_size: u64,

    /// 扫描过程中记录的软错误
    pub errors: Vec<FsError>,
}

/// 按分类汇总的大小
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub size_bytes: u64,
    pub target_count: usize,
}

/// 结果被截断时的提示信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TruncationNotice {
    /// 显示的条目数
    pub shown: usize,

    /// 总条目数
    pub total: usize,
}

/// 目标扫描报告（供展示与导出使用）
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// 扫描的根路径
    pub scanned_paths: Vec<PathBuf>,

    /// 完整结果（未截断）
    pub result: ScanResult,

    /// 截断提示；显示全部时为 None
    pub truncation: Option<TruncationNotice>,
}

/// 重复文件扫描报告
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    /// 扫描的根路径
    pub scanned_paths: Vec<PathBuf>,

    /// 按浪费空间降序排列的重复组
    pub groups: Vec<DuplicateGroup>,

    /// 所有重复组浪费的总空间
    pub total_wasted: u64,

    /// 参与比较的文件数量
    pub files_scanned: usize,

    /// 扫描过程中记录的软错误
    pub errors: Vec<FsError>,

    /// 截断提示；显示全部时为 None
    pub truncation: Option<TruncationNotice>,
}

impl ScanResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 获取总大小的友好显示
    pub fn total_size_display(&self) -> String {
        format_size(self.total_size)
    }

    /// 按分类汇总，结果按大小降序
    pub fn category_totals(&self) -> Vec<CategoryTotal> {
        let mut by_category: BTreeMap<&str, (u64, usize)> = BTreeMap::new();
        for target in &self.targets {
            let entry = by_category.entry(target.category.as_str()).or_insert((0, 0));
            entry.0 += target.size_bytes;
            entry.1 += 1;
        }

        let mut totals: Vec<CategoryTotal> = by_category
            .into_iter()
            .map(|(category, (size_bytes, target_count))| CategoryTotal {
                category: category.to_string(),
                size_bytes,
                target_count,
            })
            .collect();
        totals.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        totals
    }
}

impl ScanReport {
    /// 需要显示的目标（已按截断规则处理）
    pub fn visible_targets(&self) -> &[Target] {
        match self.truncation {
            Some(notice) => &self.result.targets[..notice.shown],
            None => &self.result.targets,
        }
    }
}

impl DuplicateReport {
    /// 需要显示的重复组（已按截断规则处理）
    pub fn visible_groups(&self) -> &[DuplicateGroup] {
        match self.truncation {
            Some(notice) => &self.groups[..notice.shown],
            None => &self.groups,
        }
    }

    /// 多余副本总数
    pub fn total_duplicates(&self) -> usize {
        self.groups.iter().map(|g| g.duplicate_count()).sum()
    }

    pub fn total_wasted_display(&self) -> String {
        format_size(self.total_wasted)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
