use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;

use crate::error::ScanError;

/// 重复检测中的单个文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCandidate {
    /// 文件路径
    pub path: PathBuf,

    /// 文件大小
    pub size_bytes: u64,

    /// 最后修改时间
    pub modified: SystemTime,
}

/// 重复组中保留哪一个文件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeepStrategy {
    /// 遍历顺序中的第一个
    #[default]
    First,
    /// 路径最短的
    Shortest,
    /// 修改时间最早的
    Oldest,
    /// 修改时间最新的
    Newest,
}

impl KeepStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeepStrategy::First => "first",
            KeepStrategy::Shortest => "shortest",
            KeepStrategy::Oldest => "oldest",
            KeepStrategy::Newest => "newest",
        }
    }
}

impl FromStr for KeepStrategy {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(KeepStrategy::First),
            "shortest" => Ok(KeepStrategy::Shortest),
            "oldest" => Ok(KeepStrategy::Oldest),
            "newest" => Ok(KeepStrategy::Newest),
            _ => Err(ScanError::InvalidKeepStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for KeepStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 内容完全相同的一组文件
///
/// 只能通过 [`DuplicateGroup::new`] 构造，保证至少两个成员且大小一致。
/// 判定依据是大小 + 非加密哈希，没有逐字节比对，理论上存在哈希碰撞误报。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    content_hash: String,
    size_bytes: u64,
    files: Vec<FileCandidate>,
}

impl DuplicateGroup {
    /// 成员少于两个或大小不一致时返回 None
    pub fn new(content_hash: impl Into<String>, files: Vec<FileCandidate>) -> Option<Self> {
        if files.len() < 2 {
            return None;
        }

        let size_bytes = files[0].size_bytes;
        if files.iter().any(|f| f.size_bytes != size_bytes) {
            return None;
        }

        Some(Self {
            content_hash: content_hash.into(),
            size_bytes,
            files,
        })
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// 单个文件的大小
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// 按遍历顺序排列的成员
    pub fn files(&self) -> &[FileCandidate] {
        &self.files
    }

    /// 多余副本数量（不含保留的那一个）
    pub fn duplicate_count(&self) -> usize {
        self.files.len() - 1
    }

    /// 多余副本浪费的空间
    pub fn wasted_bytes(&self) -> u64 {
        self.size_bytes * self.duplicate_count() as u64
    }

    /// 按策略选出保留的文件，并列时以遍历顺序靠前者为准
    pub fn keep_file(&self, strategy: KeepStrategy) -> &FileCandidate {
        &self.files[self.keep_index(strategy)]
    }

    /// 除保留文件外的其余成员
    pub fn files_to_remove(&self, strategy: KeepStrategy) -> Vec<&FileCandidate> {
        let keep = self.keep_index(strategy);
        self.files
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != keep)
            .map(|(_, f)| f)
            .collect()
    }

    fn keep_index(&self, strategy: KeepStrategy) -> usize {
        let indexed = self.files.iter().enumerate();
        let picked = match strategy {
            KeepStrategy::First => indexed.map(|(i, _)| i).next(),
            KeepStrategy::Shortest => indexed
                .reduce(|best, cur| {
                    if cur.1.path.as_os_str().len() < best.1.path.as_os_str().len() {
                        cur
                    } else {
                        best
                    }
                })
                .map(|(i, _)| i),
            KeepStrategy::Oldest => indexed
                .reduce(|best, cur| if cur.1.modified < best.1.modified { cur } else { best })
                .map(|(i, _)| i),
            KeepStrategy::Newest => indexed
                .reduce(|best, cur| if cur.1.modified > best.1.modified { cur } else { best })
                .map(|(i, _)| i),
        };

        picked.expect("DuplicateGroup is constructed with at least two files")
    }
}
