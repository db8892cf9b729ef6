use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use bloat_hunter::models::{DuplicateGroup, KeepStrategy, Target};
use bloat_hunter::patterns::{Pattern, PatternCatalog};
use bloat_hunter::safety::{SafetyGate, SafetyPolicy};
use bloat_hunter::scanner::{
    aggregate_duplicates, aggregate_targets, AggregateOptions, CancelToken, DuplicateDetector,
    ParallelConfig, PatternOverrides, ScanPlan, TargetScanner, WalkOptions, WorkerPool,
};

fn gate() -> SafetyGate {
    SafetyGate::new(SafetyPolicy::new(PathBuf::from("/nonexistent-home"), true))
}

fn pool(workers: usize) -> WorkerPool {
    let config = if workers <= 1 {
        ParallelConfig::sequential()
    } else {
        ParallelConfig::with_workers(workers)
    };
    WorkerPool::new(&config, CancelToken::new())
}

fn node_catalog() -> PatternCatalog {
    let node_modules = Pattern::literal("node_modules", "node_modules", "Node.js");
    PatternCatalog::new(vec![node_modules], true).unwrap()
}

fn write_file(path: &Path, size: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, vec![b'x'; size]).unwrap();
}

fn scan_targets(root: &Path, catalog: &PatternCatalog, workers: usize) -> Vec<Target> {
    let gate = gate();
    let pool = pool(workers);
    let outcome = TargetScanner::new(catalog, &gate, &pool)
        .scan(&[root.to_path_buf()], WalkOptions::new(5))
        .unwrap();
    let report = aggregate_targets(&[root.to_path_buf()], &outcome, &AggregateOptions::default());
    report.result.targets
}

fn find_groups(root: &Path, min_size: u64, workers: usize) -> Vec<DuplicateGroup> {
    let gate = gate();
    let pool = pool(workers);
    let outcome = DuplicateDetector::new(&gate, &pool)
        .find_duplicates(&[root.to_path_buf()], min_size)
        .unwrap();
    aggregate_duplicates(&[root.to_path_buf()], &outcome, &AggregateOptions::default()).groups
}

#[test]
fn test_node_modules_found_and_src_absent() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("a/node_modules/x.txt"), 1024);
    write_file(&root.join("a/src/main.py"), 2048);

    let targets = scan_targets(root, &node_catalog(), 4);

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].path, root.join("a/node_modules"));
    assert_eq!(targets[0].size_bytes, 1024);
    assert_eq!(targets[0].file_count, 1);
    assert!(targets.iter().all(|t| t.path != root.join("a/src")));
}

#[test]
fn test_protected_match_is_never_emitted() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("app/package.json"), 2);
    write_file(&root.join("app/src/index.js"), 100);
    write_file(&root.join("app/node_modules/lib/index.js"), 300);

    let catalog = PatternCatalog::new(
        vec![
            Pattern::literal("node_modules", "node_modules", "Node.js"),
            Pattern::literal("src", "src", "Custom"),
        ],
        true,
    )
    .unwrap();

    let targets = scan_targets(root, &catalog, 2);
    let paths: Vec<&PathBuf> = targets.iter().map(|t| &t.path).collect();

    assert_eq!(paths, vec![&root.join("app/node_modules")]);
}

#[test]
fn test_scan_is_idempotent() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    for (i, size) in [500usize, 1500, 250].iter().enumerate() {
        write_file(&root.join(format!("p{}/node_modules/f.bin", i)), *size);
    }

    let first = scan_targets(root, &node_catalog(), 4);
    let second = scan_targets(root, &node_catalog(), 4);

    assert_eq!(first, second);
    assert_eq!(first.iter().map(|t| t.size_bytes).sum::<u64>(), 2250);
    assert_eq!(first[0].size_bytes, 1500);
}

#[test]
fn test_worker_count_does_not_change_targets() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    for i in 0..12 {
        write_file(&root.join(format!("team/p{}/node_modules/a.bin", i)), 100 + i * 10);
        write_file(&root.join(format!("team/p{}/node_modules/b/c.bin", i)), 7);
    }

    let sequential = scan_targets(root, &node_catalog(), 1);
    let parallel = scan_targets(root, &node_catalog(), 8);

    assert_eq!(sequential.len(), 12);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_duplicates_of_ten_ten_twenty() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("one.txt"), b"0123456789").unwrap();
    fs::write(root.join("two.txt"), b"0123456789").unwrap();
    fs::write(root.join("big.txt"), b"01234567890123456789").unwrap();

    let groups = find_groups(root, 0, 4);

    assert_eq!(groups.len(), 1);
    let members: Vec<&PathBuf> = groups[0].files().iter().map(|f| &f.path).collect();
    assert_eq!(members, vec![&root.join("one.txt"), &root.join("two.txt")]);
    assert!(members.iter().all(|p| !p.ends_with("big.txt")));
    assert_eq!(groups[0].wasted_bytes(), 10);
}

#[test]
fn test_unique_size_yields_no_group() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("lonely.bin"), b"abc").unwrap();

    assert!(find_groups(root, 0, 2).is_empty());
}

#[test]
fn test_same_size_different_content_is_not_duplicate() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("a.bin"), b"aaaa").unwrap();
    fs::write(root.join("b.bin"), b"bbbb").unwrap();

    assert!(find_groups(root, 0, 2).is_empty());
}

#[test]
fn test_duplicate_groups_hold_invariants() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    for dir in ["x", "y", "z"] {
        fs::create_dir_all(root.join(dir)).unwrap();
        fs::write(root.join(dir).join("photo.jpg"), vec![7u8; 4096]).unwrap();
        fs::write(root.join(dir).join("notes.txt"), b"same notes").unwrap();
    }
    fs::write(root.join("x/unique.txt"), b"nothing like it").unwrap();

    let groups = find_groups(root, 0, 4);
    assert_eq!(groups.len(), 2);
    // 按浪费空间降序
    assert_eq!(groups[0].size_bytes(), 4096);

    for group in &groups {
        assert!(group.files().len() >= 2);
        assert!(group.files().iter().all(|f| f.size_bytes == group.size_bytes()));

        for strategy in [
            KeepStrategy::First,
            KeepStrategy::Shortest,
            KeepStrategy::Oldest,
            KeepStrategy::Newest,
        ] {
            let kept = group.keep_file(strategy);
            assert!(group.files().contains(kept));
            assert_eq!(group.files_to_remove(strategy).len(), group.files().len() - 1);
        }
    }
}

#[test]
fn test_worker_count_does_not_change_duplicates() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    for i in 0..6 {
        for copy in 0..3 {
            let path = root.join(format!("set{}/copy{}.dat", i, copy));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, vec![i as u8; 512 + i * 64]).unwrap();
        }
    }

    let sequential = find_groups(root, 0, 1);
    let parallel = find_groups(root, 0, 6);

    assert_eq!(sequential.len(), 6);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_bloat_profile_end_to_end() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("web/package.json"), 10);
    write_file(&root.join("web/src/app.js"), 50);
    write_file(&root.join("web/node_modules/react/index.js"), 4000);
    write_file(&root.join("web/.git/objects/ab"), 900);
    write_file(&root.join("tool/pyproject.toml"), 10);
    write_file(&root.join("tool/pkg/__pycache__/mod.cpython-312.pyc"), 600);

    let plan =
        ScanPlan::bloat(root.to_path_buf(), false, &PatternOverrides::default(), true).unwrap();
    let gate = gate();
    let outcome = plan.run(&gate, &pool(4), false).unwrap();
    let report = aggregate_targets(&plan.roots, &outcome, &AggregateOptions::default());

    let paths: Vec<&PathBuf> = report.result.targets.iter().map(|t| &t.path).collect();
    assert_eq!(
        paths,
        vec![&root.join("web/node_modules"), &root.join("tool/pkg/__pycache__")]
    );
    assert_eq!(report.result.total_size, 4600);
    assert!(report.truncation.is_none());
}

#[test]
fn test_disabled_pattern_is_not_matched() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("web/node_modules/a.js"), 10);
    write_file(&root.join("lib/__pycache__/a.pyc"), 10);

    let overrides = PatternOverrides {
        disabled: vec!["node_modules".to_string()],
        extra: Vec::new(),
    };
    let plan = ScanPlan::bloat(root.to_path_buf(), false, &overrides, true).unwrap();
    let outcome = plan.run(&gate(), &pool(2), false).unwrap();

    assert_eq!(outcome.targets.len(), 1);
    assert_eq!(outcome.targets[0].path, root.join("lib/__pycache__"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_is_soft_error() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    for i in 0..10 {
        write_file(&root.join(format!("p{}/node_modules/x.bin", i)), 100);
    }
    let locked = root.join("p3");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // 以 root 运行时权限限制不生效，由下面的超长路径测试覆盖
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        eprintln!("以 root 运行，跳过权限测试");
        return;
    }

    let gate = gate();
    let pool = pool(4);
    let outcome = TargetScanner::new(&node_catalog(), &gate, &pool)
        .scan(&[root.to_path_buf()], WalkOptions::new(5))
        .unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(outcome.targets.len(), 9);
    assert!(outcome.targets.iter().all(|t| !t.path.starts_with(&locked)));
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].path, locked);
}

/// 逐级追加 200 字符的目录名，直到路径长度不小于 `min_len`
#[cfg(target_os = "linux")]
fn deep_dir(base: &Path, min_len: usize) -> PathBuf {
    let segment = "d".repeat(200);
    let mut path = base.to_path_buf();
    while path.as_os_str().len() < min_len {
        path.push(&segment);
    }
    fs::create_dir_all(&path).unwrap();
    path
}

// 超过 PATH_MAX 的路径即使以 root 运行也无法打开
#[cfg(target_os = "linux")]
#[test]
fn test_unreachable_directory_is_soft_error_for_any_user() {
    let temp_dir = tempdir().unwrap();
    let work = temp_dir.path().join("w");
    let locked_name = format!("p3{}", "q".repeat(248));
    for i in 0..10 {
        let name = if i == 3 { locked_name.clone() } else { format!("p{}", i) };
        write_file(&work.join(name).join("node_modules/x.bin"), 100);
    }

    // 只有 p3 下的路径超出上限
    let root = deep_dir(&temp_dir.path().join("c"), 3850).join("w");
    fs::rename(&work, &root).unwrap();
    let locked = root.join(&locked_name);

    let gate = gate();
    let pool = pool(4);
    let outcome = TargetScanner::new(&node_catalog(), &gate, &pool)
        .scan(&[root.clone()], WalkOptions::new(5))
        .unwrap();

    assert_eq!(outcome.targets.len(), 9);
    assert!(outcome.targets.iter().all(|t| !t.path.starts_with(&locked)));
    assert!(outcome.targets.iter().all(|t| t.size_bytes == 100));
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].path, locked);
}

#[cfg(target_os = "linux")]
#[test]
fn test_unreadable_entry_inside_target_is_reported() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path().join("r");
    let modules = root.join("a/node_modules");
    write_file(&modules.join("top.bin"), 100);

    let stage = temp_dir.path().join("stage");
    let deep = deep_dir(&stage, 3850);
    write_file(&deep.join("lost.bin"), 50);

    let long = modules.join("l".repeat(250));
    fs::create_dir(&long).unwrap();
    fs::rename(&stage, long.join("stage")).unwrap();

    let gate = gate();
    let pool = pool(2);
    let outcome = TargetScanner::new(&node_catalog(), &gate, &pool)
        .scan(&[root.clone()], WalkOptions::new(5))
        .unwrap();

    assert_eq!(outcome.targets.len(), 1);
    assert_eq!(outcome.targets[0].path, modules);
    assert_eq!(outcome.targets[0].size_bytes, 100);
    assert_eq!(outcome.targets[0].file_count, 1);
    assert!(!outcome.errors.is_empty());
    assert!(outcome.errors.iter().all(|e| e.path.starts_with(&long)));
}

#[test]
fn test_cancelled_token_stops_scan() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    write_file(&root.join("a/node_modules/x"), 10);

    let cancel = CancelToken::new();
    cancel.cancel();
    let pool = WorkerPool::new(&ParallelConfig::with_workers(2), cancel);
    let gate = gate();

    let result = TargetScanner::new(&node_catalog(), &gate, &pool)
        .scan(&[root.to_path_buf()], WalkOptions::new(5));
    assert!(matches!(result, Err(e) if e.is_cancelled()));
}
