use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::patterns::{Pattern, SafetyLevel};

/// 第一阶段发现的候选项（尚未计算大小）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// 候选路径
    pub path: PathBuf,

    /// 匹配到的模式名称
    pub pattern_name: String,

    /// 模式分类
    pub category: String,

    /// 模式的安全级别
    pub safety_level: SafetyLevel,

    /// 是否是目录
    pub is_directory: bool,
}

/// 计算完大小的清理目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// 目标路径
    pub path: PathBuf,

    /// 匹配到的模式名称
    pub matched_pattern: String,

    /// 模式分类
    pub category: String,

    /// 模式的安全级别
    pub safety_level: SafetyLevel,

    /// 占用字节数
    pub size_bytes: u64,

    /// 包含的文件数量
    pub file_count: u64,

    /// 是否是目录
    pub is_directory: bool,
}

impl Candidate {
    pub fn new(path: PathBuf, pattern: &Pattern, is_directory: bool) -> Self {
        Self {
            path,
            pattern_name: pattern.name.clone(),
            category: pattern.category.clone(),
            safety_level: pattern.safety_level,
            is_directory,
        }
    }

    /// 附上第二阶段计算出的大小，得到最终目标
    pub fn into_target(self, size_bytes: u64, file_count: u64) -> Target {
        Target {
            path: self.path,
            matched_pattern: self.pattern_name,
            category: self.category,
            safety_level: self.safety_level,
            size_bytes,
            file_count,
            is_directory: self.is_directory,
        }
    }
}
