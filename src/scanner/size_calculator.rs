use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{FsError, ScanError};
use crate::scanner::CancelToken;

/// 每处理多少个条目检查一次取消标记
const CANCEL_CHECK_INTERVAL: u64 = 256;

/// 路径占用的空间
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSize {
    /// 所有普通文件大小之和
    pub size_bytes: u64,

    /// 普通文件数量
    pub file_count: u64,

    /// 内部无法读取的条目；对应部分不计入大小
    pub errors: Vec<FsError>,
}

/// 计算文件或目录占用的空间
///
/// 不跟随符号链接。路径本身无法读取时返回错误；内部的读取错误记录到
/// [`PathSize::errors`] 后跳过该条目。
pub fn measure_path(path: &Path, cancel: &CancelToken) -> Result<PathSize, ScanError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| ScanError::io(path, e))?;

    if !metadata.is_dir() {
        return Ok(PathSize {
            size_bytes: if metadata.is_file() { metadata.len() } else { 0 },
            file_count: if metadata.is_file() { 1 } else { 0 },
            errors: Vec::new(),
        });
    }

    let mut size = PathSize::default();
    let mut visited = 0u64;

    for entry in WalkDir::new(path).follow_links(false) {
        visited += 1;
        if visited % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "无法读取目录"));
                return Err(ScanError::io(path, source));
            }
            Err(err) => {
                let error = FsError::from_walk(&err, path);
                tracing::warn!("计算大小时无法访问 {}: {}", error.path.display(), error.message);
                size.errors.push(error);
                continue;
            }
        };

        if entry.file_type().is_file() {
            match entry.metadata() {
                Ok(metadata) => {
                    size.size_bytes += metadata.len();
                    size.file_count += 1;
                }
                Err(err) => {
                    let error = FsError::from_walk(&err, entry.path());
                    tracing::warn!("无法读取文件元数据 {}: {}", error.path.display(), error.message);
                    size.errors.push(error);
                }
            }
        }
    }

    Ok(size)
}
