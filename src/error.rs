use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 扫描过程中的错误
///
/// 只有 `Io` 属于软错误：记录到结果的错误列表后继续扫描。
/// `Cancelled` 代表用户中断，必须一路向上传播，不能被当作文件系统错误吞掉。
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("扫描已被用户取消")]
    Cancelled,

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("无效的大小: '{0}' (示例: 1KB, 10MB, 1GB)")]
    InvalidSize(String),

    #[error("无效的保留策略: '{0}' (可选: first, shortest, oldest, newest)")]
    InvalidKeepStrategy(String),

    #[error("无效的模式 '{name}': {message}")]
    InvalidPattern { name: String, message: String },

    #[error("配置错误: {0}")]
    Config(String),
}

impl ScanError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }

    /// 是否为可以记录后继续的文件系统错误
    pub fn is_soft(&self) -> bool {
        matches!(self, ScanError::Io { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }

    /// 转换为结果中的错误条目；非软错误返回 None
    pub fn to_fs_error(&self) -> Option<FsError> {
        match self {
            ScanError::Io { path, source } => Some(FsError::new(path, source.to_string())),
            _ => None,
        }
    }
}

/// 结果中记录的软错误条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsError {
    /// 出错的路径
    pub path: PathBuf,

    /// 错误信息
    pub message: String,
}

impl FsError {
    pub fn new(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// 从 walkdir 的遍历错误构造，缺少路径时使用 `fallback`
    pub fn from_walk(err: &walkdir::Error, fallback: &Path) -> Self {
        let path = err.path().unwrap_or(fallback);
        let message = match err.io_error() {
            Some(io_err) => io_err.to_string(),
            None => err.to_string(),
        };
        Self::new(path, message)
    }
}
