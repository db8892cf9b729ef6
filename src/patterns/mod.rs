//! 模式目录：用字面量 / glob / 正则描述可清理的目录或文件名
//!
//! 每种扫描（项目垃圾、系统缓存、包管理器缓存）只是注入不同的 [`PatternCatalog`]，
//! 匹配逻辑本身完全相同。

pub mod builtin;
pub mod matcher;

pub use matcher::PatternCatalog;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 模式类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// 与路径最后一段完全相同
    Literal,
    /// glob 表达式；包含 `/` 时匹配完整路径，否则匹配最后一段
    Glob,
    /// 正则表达式，从最后一段的开头开始匹配
    Regex,
}

/// 模式的安全级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyLevel {
    /// 可以放心删除，可再生成
    #[default]
    Safe,
    /// 通常可以删除，但需要用户确认
    Caution,
    /// 匹配后停止向下遍历，但永远不会成为清理目标（例如 `.git`）
    ProtectedExempt,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Caution => "caution",
            SafetyLevel::ProtectedExempt => "protected-exempt",
        }
    }
}

/// 额外的文件系统校验，全部通过才算匹配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Requirement {
    /// 目录下存在任意一个条目
    ContainsAny(Vec<String>),
    /// 父目录下存在任意一个条目
    ParentContainsAny(Vec<String>),
    /// 父目录名称必须等于给定值
    ParentNamed(String),
}

impl Requirement {
    pub fn is_satisfied(&self, path: &Path) -> bool {
        match self {
            Requirement::ContainsAny(entries) => {
                entries.iter().any(|entry| path.join(entry).exists())
            }
            Requirement::ParentContainsAny(entries) => match path.parent() {
                Some(parent) => entries.iter().any(|entry| parent.join(entry).exists()),
                None => false,
            },
            Requirement::ParentNamed(name) => path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy() == name.as_str())
                .unwrap_or(false),
        }
    }
}

/// 单条模式定义（不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// 显示名称，多条表达式可以共用一个名称
    pub name: String,

    /// 模式类型
    pub kind: PatternKind,

    /// 表达式
    pub expression: String,

    /// 分类（例如 "Node.js"、"Browser"、"npm"）
    pub category: String,

    /// 安全级别
    #[serde(default)]
    pub safety_level: SafetyLevel,

    /// 描述
    #[serde(default)]
    pub description: String,

    /// 额外校验
    #[serde(default)]
    pub requires: Option<Requirement>,

    /// 祖先目录名称命中其中任意一个时不匹配
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl Pattern {
    fn new(kind: PatternKind, name: &str, expression: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            expression: expression.to_string(),
            category: category.to_string(),
            safety_level: SafetyLevel::Safe,
            description: String::new(),
            requires: None,
            exclusions: Vec::new(),
        }
    }

    pub fn literal(name: &str, expression: &str, category: &str) -> Self {
        Self::new(PatternKind::Literal, name, expression, category)
    }

    pub fn glob(name: &str, expression: &str, category: &str) -> Self {
        Self::new(PatternKind::Glob, name, expression, category)
    }

    pub fn regex(name: &str, expression: &str, category: &str) -> Self {
        Self::new(PatternKind::Regex, name, expression, category)
    }

    pub fn safety(mut self, level: SafetyLevel) -> Self {
        self.safety_level = level;
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn requires(mut self, requirement: Requirement) -> Self {
        self.requires = Some(requirement);
        self
    }

    pub fn excluding(mut self, ancestors: &[&str]) -> Self {
        self.exclusions = ancestors.iter().map(|s| s.to_string()).collect();
        self
    }
}
