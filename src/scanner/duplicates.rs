use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;
use xxhash_rust::xxh3::Xxh3;

use crate::error::{FsError, ScanError};
use crate::models::{DuplicateGroup, FileCandidate};
use crate::safety::SafetyGate;
use crate::scanner::{CancelToken, WorkerPool};
use crate::utils::progress;

/// 默认最小文件大小：1 MiB
pub const DEFAULT_MIN_SIZE: u64 = 1024 * 1024;

/// 哈希时每次读取的字节数
const CHUNK_SIZE: usize = 64 * 1024;

/// 重复检测的原始结果（未排序）
#[derive(Debug, Clone, Default)]
pub struct DuplicateOutcome {
    pub groups: Vec<DuplicateGroup>,

    /// 达到最小大小、参与比较的文件数
    pub files_scanned: usize,

    pub errors: Vec<FsError>,
}

/// 第一阶段：收集不小于 `min_size` 的普通文件
///
/// 不跟随符号链接，受保护的目录整个跳过。
pub fn collect_files(
    root: &Path,
    min_size: u64,
    gate: &SafetyGate,
    cancel: &CancelToken,
    seen: &mut HashSet<PathBuf>,
    files: &mut Vec<FileCandidate>,
    errors: &mut Vec<FsError>,
) -> Result<(), ScanError> {
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
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

        let file_type = entry.file_type();
        if file_type.is_dir() {
            if gate.blocks_traversal(entry.path()) {
                tracing::debug!("跳过受保护目录: {}", entry.path().display());
                walker.skip_current_dir();
            }
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                errors.push(FsError::from_walk(&err, entry.path()));
                continue;
            }
        };

        if metadata.len() < min_size || !seen.insert(entry.path().to_path_buf()) {
            continue;
        }

        files.push(FileCandidate {
            path: entry.into_path(),
            size_bytes: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }

    Ok(())
}

/// 按大小分桶，丢弃只有一个文件的桶；桶内保持遍历顺序
pub fn bucket_by_size(files: Vec<FileCandidate>) -> Vec<Vec<FileCandidate>> {
    let mut buckets: BTreeMap<u64, Vec<FileCandidate>> = BTreeMap::new();
    for file in files {
        buckets.entry(file.size_bytes).or_default().push(file);
    }

    buckets
        .into_values()
        .filter(|bucket| bucket.len() >= 2)
        .collect()
}

/// 流式计算文件内容的 XXH3 哈希（十六进制）
pub fn hash_file(path: &Path, cancel: &CancelToken) -> Result<String, ScanError> {
    let mut file = File::open(path).map_err(|e| ScanError::io(path, e))?;
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        cancel.check()?;
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ScanError::io(path, e)),
        };
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:016x}", hasher.digest()))
}

/// 同一大小桶内按哈希分组，保持遍历顺序
fn group_bucket(bucket: Vec<FileCandidate>, hashes: Vec<Option<String>>) -> Vec<DuplicateGroup> {
    let mut order: Vec<(String, Vec<FileCandidate>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (file, hash) in bucket.into_iter().zip(hashes) {
        let Some(hash) = hash else { continue };
        match index.get(&hash) {
            Some(&slot) => order[slot].1.push(file),
            None => {
                index.insert(hash.clone(), order.len());
                order.push((hash, vec![file]));
            }
        }
    }

    order
        .into_iter()
        .filter_map(|(hash, files)| DuplicateGroup::new(hash, files))
        .collect()
}

/// 两阶段重复文件检测器
pub struct DuplicateDetector<'a> {
    gate: &'a SafetyGate,
    pool: &'a WorkerPool,
    show_progress: bool,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(gate: &'a SafetyGate, pool: &'a WorkerPool) -> Self {
        Self {
            gate,
            pool,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn find_duplicates(
        &self,
        roots: &[PathBuf],
        min_size: u64,
    ) -> Result<DuplicateOutcome, ScanError> {
        let cancel = self.pool.cancel_token();
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        let mut errors = Vec::new();

        let spinner = progress::spinner(self.show_progress, "正在收集文件...");
        for root in roots {
            spinner.set_message(format!("扫描: {}", root.display()));
            collect_files(root, min_size, self.gate, cancel, &mut seen, &mut files, &mut errors)?;
        }
        spinner.finish_and_clear();

        let files_scanned = files.len();
        let buckets = bucket_by_size(files);
        let to_hash: Vec<&Path> = buckets
            .iter()
            .flat_map(|bucket| bucket.iter().map(|f| f.path.as_path()))
            .collect();
        tracing::info!(
            "共 {} 个文件，其中 {} 个大小相同，开始计算哈希",
            files_scanned,
            to_hash.len()
        );

        let bar = progress::bar(self.show_progress, to_hash.len() as u64, "计算哈希");
        let tasks: Vec<_> = to_hash
            .iter()
            .map(|&path| {
                let bar = &bar;
                move || {
                    let hash = hash_file(path, cancel);
                    bar.inc(1);
                    hash
                }
            })
            .collect();
        let output = self.pool.run_unordered(tasks)?;
        bar.finish_and_clear();

        for (index, error) in &output.errors {
            let entry = error
                .to_fs_error()
                .unwrap_or_else(|| FsError::new(to_hash[*index], error.to_string()));
            tracing::warn!("读取文件失败 {}: {}", entry.path.display(), entry.message);
            errors.push(entry);
        }

        let mut hashes: Vec<Option<String>> = vec![None; to_hash.len()];
        for (index, hash) in output.completed {
            hashes[index] = Some(hash);
        }
        drop(to_hash);

        let mut groups = Vec::new();
        let mut remaining = hashes.into_iter();
        for bucket in buckets {
            let bucket_hashes: Vec<Option<String>> =
                remaining.by_ref().take(bucket.len()).collect();
            groups.extend(group_bucket(bucket, bucket_hashes));
        }

        Ok(DuplicateOutcome {
            groups,
            files_scanned,
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::SafetyPolicy;
    use crate::scanner::ParallelConfig;
    use std::fs;
    use tempfile::TempDir;

    fn open_gate() -> SafetyGate {
        SafetyGate::new(SafetyPolicy::new(PathBuf::from("/nonexistent-home"), true))
    }

    fn candidate(path: &str, size: u64) -> FileCandidate {
        FileCandidate {
            path: PathBuf::from(path),
            size_bytes: size,
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_bucket_by_size_drops_unique_sizes() {
        let buckets = bucket_by_size(vec![
            candidate("/a", 10),
            candidate("/b", 20),
            candidate("/c", 10),
            candidate("/d", 30),
            candidate("/e", 30),
            candidate("/f", 30),
        ]);

        assert_eq!(buckets.len(), 2);
        let paths: Vec<Vec<&str>> = buckets
            .iter()
            .map(|b| b.iter().map(|f| f.path.to_str().unwrap()).collect())
            .collect();
        assert_eq!(paths, vec![vec!["/a", "/c"], vec!["/d", "/e", "/f"]]);
    }

    #[test]
    fn test_hash_file_matches_content() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        let c = temp_dir.path().join("c");
        let big = vec![7u8; CHUNK_SIZE * 2 + 13];
        fs::write(&a, &big).unwrap();
        fs::write(&b, &big).unwrap();
        let mut other = big.clone();
        other[CHUNK_SIZE + 1] = 8;
        fs::write(&c, &other).unwrap();

        let cancel = CancelToken::new();
        let ha = hash_file(&a, &cancel).unwrap();
        assert_eq!(ha.len(), 16);
        assert_eq!(ha, hash_file(&b, &cancel).unwrap());
        assert_ne!(ha, hash_file(&c, &cancel).unwrap());
        assert_eq!(ha, format!("{:016x}", xxhash_rust::xxh3::xxh3_64(&big)));
    }

    #[test]
    fn test_collect_respects_min_size() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("small"), vec![0u8; 5]).unwrap();
        fs::write(root.join("large"), vec![0u8; 50]).unwrap();

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        let mut errors = Vec::new();
        collect_files(
            root,
            10,
            &open_gate(),
            &CancelToken::new(),
            &mut seen,
            &mut files,
            &mut errors,
        )
        .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, root.join("large"));
        assert_eq!(files[0].size_bytes, 50);
    }

    #[test]
    fn test_find_duplicates_groups_equal_content() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("backup")).unwrap();
        fs::write(root.join("photo.jpg"), b"same bytes here").unwrap();
        fs::write(root.join("backup/photo.jpg"), b"same bytes here").unwrap();
        fs::write(root.join("other.jpg"), b"diff bytes here").unwrap();

        for workers in [1, 4] {
            let gate = open_gate();
            let pool = WorkerPool::new(&ParallelConfig::with_workers(workers), CancelToken::new());
            let outcome = DuplicateDetector::new(&gate, &pool)
                .find_duplicates(&[root.to_path_buf()], 1)
                .unwrap();

            assert_eq!(outcome.files_scanned, 3);
            assert_eq!(outcome.groups.len(), 1);
            let group = &outcome.groups[0];
            let paths: Vec<PathBuf> = group.files().iter().map(|f| f.path.clone()).collect();
            assert_eq!(paths, vec![root.join("backup/photo.jpg"), root.join("photo.jpg")]);
            assert_eq!(group.size_bytes(), 15);
        }
    }

    #[test]
    fn test_symlinked_files_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("real.bin"), vec![1u8; 64]).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(root.join("real.bin"), root.join("alias.bin")).unwrap();

        let gate = open_gate();
        let pool = WorkerPool::new(&ParallelConfig::sequential(), CancelToken::new());
        let outcome = DuplicateDetector::new(&gate, &pool)
            .find_duplicates(&[root.to_path_buf()], 1)
            .unwrap();

        assert_eq!(outcome.files_scanned, 1);
        assert!(outcome.groups.is_empty());
    }
}
