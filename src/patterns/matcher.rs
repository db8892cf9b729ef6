use globset::{GlobBuilder, GlobMatcher};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::path::{Component, Path};

use crate::error::ScanError;
use crate::patterns::{Pattern, PatternKind};

/// 编译好的模式目录，构建后只读，可在多个工作线程间共享
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    patterns: Vec<Pattern>,

    /// 字面量 -> 模式下标（按目录顺序）
    literals: HashMap<String, Vec<usize>>,

    /// (模式下标, 匹配器, 是否匹配完整路径)
    globs: Vec<(usize, GlobMatcher, bool)>,

    regexes: Vec<(usize, Regex)>,

    case_sensitive: bool,
}

impl PatternCatalog {
    /// 编译模式目录；任意表达式无效时返回错误
    pub fn new(patterns: Vec<Pattern>, case_sensitive: bool) -> Result<Self, ScanError> {
        let mut literals: HashMap<String, Vec<usize>> = HashMap::new();
        let mut globs = Vec::new();
        let mut regexes = Vec::new();

        for (index, pattern) in patterns.iter().enumerate() {
            match pattern.kind {
                PatternKind::Literal => {
                    let key = fold_case(&pattern.expression, case_sensitive);
                    literals.entry(key).or_default().push(index);
                }
                PatternKind::Glob => {
                    let matcher = GlobBuilder::new(&pattern.expression)
                        .case_insensitive(!case_sensitive)
                        .literal_separator(true)
                        .build()
                        .map_err(|e| ScanError::InvalidPattern {
                            name: pattern.name.clone(),
                            message: e.to_string(),
                        })?
                        .compile_matcher();
                    let full_path = pattern.expression.contains('/');
                    globs.push((index, matcher, full_path));
                }
                PatternKind::Regex => {
                    let regex = RegexBuilder::new(&format!("^(?:{})", pattern.expression))
                        .case_insensitive(!case_sensitive)
                        .build()
                        .map_err(|e| ScanError::InvalidPattern {
                            name: pattern.name.clone(),
                            message: e.to_string(),
                        })?;
                    regexes.push((index, regex));
                }
            }
        }

        Ok(Self {
            patterns,
            literals,
            globs,
            regexes,
            case_sensitive,
        })
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// 查找第一个匹配该路径的模式
    ///
    /// 依次检查字面量、glob、正则；同一类中按目录顺序，先匹配者胜出。
    pub fn match_path(&self, path: &Path) -> Option<&Pattern> {
        let name = path.file_name()?.to_string_lossy();

        if let Some(indices) = self.literals.get(&fold_case(&name, self.case_sensitive)) {
            if let Some(&index) = indices.iter().find(|&&i| self.accepts(i, path)) {
                return Some(&self.patterns[index]);
            }
        }

        for (index, matcher, full_path) in &self.globs {
            let hit = if *full_path {
                matcher.is_match(path)
            } else {
                matcher.is_match(Path::new(name.as_ref()))
            };
            if hit && self.accepts(*index, path) {
                return Some(&self.patterns[*index]);
            }
        }

        for (index, regex) in &self.regexes {
            if regex.is_match(&name) && self.accepts(*index, path) {
                return Some(&self.patterns[*index]);
            }
        }

        None
    }

    /// 检查排除项与额外校验
    fn accepts(&self, index: usize, path: &Path) -> bool {
        let pattern = &self.patterns[index];

        if !pattern.exclusions.is_empty() {
            let excluded = path
                .parent()
                .into_iter()
                .flat_map(|parent| parent.components())
                .filter_map(|component| match component {
                    Component::Normal(segment) => Some(segment.to_string_lossy()),
                    _ => None,
                })
                .any(|segment| {
                    pattern.exclusions.iter().any(|excluded| {
                        fold_case(excluded, self.case_sensitive)
                            == fold_case(&segment, self.case_sensitive)
                    })
                });
            if excluded {
                return false;
            }
        }

        match &pattern.requires {
            Some(requirement) => requirement.is_satisfied(path),
            None => true,
        }
    }
}

fn fold_case(value: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        value.to_string()
    } else {
        value.to_lowercase()
    }
}
