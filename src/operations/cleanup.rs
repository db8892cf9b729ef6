use anyhow::anyhow;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{FsError, ScanError};
use crate::models::{DuplicateGroup, KeepStrategy, Target};
use crate::patterns::SafetyLevel;
use crate::safety::SafetyGate;
use crate::scanner::CancelToken;

/// 待删除的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupItem {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub safety_level: SafetyLevel,
}

impl CleanupItem {
    pub fn from_target(target: &Target) -> Self {
        Self {
            path: target.path.clone(),
            size_bytes: target.size_bytes,
            safety_level: target.safety_level,
        }
    }

    /// 按保留策略列出重复组中需要删除的文件
    pub fn from_duplicates(groups: &[DuplicateGroup], keep: KeepStrategy) -> Vec<Self> {
        groups
            .iter()
            .flat_map(|group| group.files_to_remove(keep))
            .map(|file| Self {
                path: file.path.clone(),
                size_bytes: file.size_bytes,
                safety_level: SafetyLevel::Safe,
            })
            .collect()
    }
}

/// 删除方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOptions {
    /// 只统计，不删除
    pub dry_run: bool,

    /// 移到回收站；关闭时永久删除
    pub use_trash: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            use_trash: true,
        }
    }
}

/// 跳过的条目及原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub path: PathBuf,
    pub reason: String,
}

/// 一次清理的结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// 已删除（或 dry-run 下将被删除）的路径
    pub removed: Vec<PathBuf>,

    /// 释放（或将释放）的字节数
    pub freed_bytes: u64,

    /// 被安全检查拦下或已不存在的条目
    pub skipped: Vec<SkippedItem>,

    /// 删除失败的条目
    pub failures: Vec<FsError>,

    pub dry_run: bool,
}

impl CleanupReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// 在删除前重新经过安全检查的清理器
pub struct Cleaner<'a> {
    gate: &'a SafetyGate,
    options: CleanupOptions,
}

impl<'a> Cleaner<'a> {
    pub fn new(gate: &'a SafetyGate, options: CleanupOptions) -> Self {
        Self { gate, options }
    }

    /// 逐个处理条目；单个失败不会中断整个批次，取消时立即停止
    pub fn clean(
        &self,
        items: &[CleanupItem],
        cancel: &CancelToken,
    ) -> Result<CleanupReport, ScanError> {
        let mut report = CleanupReport {
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        for item in items {
            if cancel.is_cancelled() {
                warn!("清理已取消，已处理 {} 项", report.removed.len());
                return Err(ScanError::Cancelled);
            }

            if let Some(reason) = self.refusal(item) {
                debug!("跳过 {}: {}", item.path.display(), reason);
                report.skipped.push(SkippedItem {
                    path: item.path.clone(),
                    reason,
                });
                continue;
            }

            if self.options.dry_run {
                report.removed.push(item.path.clone());
                report.freed_bytes += item.size_bytes;
                continue;
            }

            match self.remove(&item.path) {
                Ok(()) => {
                    debug!("已删除: {}", item.path.display());
                    report.removed.push(item.path.clone());
                    report.freed_bytes += item.size_bytes;
                }
                Err(e) => {
                    warn!("删除失败 {}: {}", item.path.display(), e);
                    report.failures.push(FsError::new(&item.path, e.to_string()));
                }
            }
        }

        info!(
            "清理完成: {} 项已处理, {} 项跳过, {} 项失败",
            report.removed.len(),
            report.skipped.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn refusal(&self, item: &CleanupItem) -> Option<String> {
        if item.safety_level == SafetyLevel::ProtectedExempt {
            return Some("受保护的模式，永不删除".to_string());
        }
        if self.gate.is_protected(&item.path) {
            return Some("受保护的路径".to_string());
        }
        if fs::symlink_metadata(&item.path).is_err() {
            return Some("路径已不存在".to_string());
        }
        None
    }

    fn remove(&self, path: &Path) -> anyhow::Result<()> {
        if self.options.use_trash {
            return trash::delete(path).map_err(|e| anyhow!("无法移到回收站: {}", e));
        }

        let metadata = fs::symlink_metadata(path)?;
        if metadata.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
