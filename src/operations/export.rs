use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Value};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{DuplicateReport, KeepStrategy, ScanReport, Target};
use crate::platform::PlatformInfo;
use crate::utils::format_size;

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// 根据文件扩展名推断格式，无法识别时为 JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            _ => ExportFormat::Json,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => anyhow::bail!("不支持的导出格式: {} (可选: json, csv)", other),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

fn target_json(target: &Target) -> Value {
    json!({
        "path": target.path,
        "category": target.category,
        "pattern_name": target.matched_pattern,
        "safety_level": target.safety_level.as_str(),
        "is_directory": target.is_directory,
        "size_bytes": target.size_bytes,
        "size_human": format_size(target.size_bytes),
        "file_count": target.file_count,
    })
}

/// 目标扫描报告转为 JSON；`kind` 为 scan / caches / packages，缓存类扫描附带平台信息
pub fn targets_to_json(report: &ScanReport, kind: &str, platform: Option<&PlatformInfo>) -> Value {
    let result = &report.result;
    let mut value = json!({
        "type": kind,
        "timestamp": Utc::now().to_rfc3339(),
        "scanned_paths": report.scanned_paths,
        "total_size_bytes": result.total_size,
        "total_size_human": result.total_size_display(),
        "target_count": result.targets.len(),
        "categories": result.category_totals(),
        "targets": result.targets.iter().map(target_json).collect::<Vec<_>>(),
        "scan_errors": result.errors,
    });
    if let Some(platform) = platform {
        value["platform"] = json!({
            "name": platform.name,
            "variant": platform.variant,
            "is_wsl": platform.is_wsl,
        });
    }
    value
}

/// 修改时间（Unix 秒）；早于纪元时记为 0
fn mtime_secs(modified: SystemTime) -> f64 {
    modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// 重复文件报告转为 JSON，每个文件标注保留或删除
pub fn duplicates_to_json(report: &DuplicateReport, keep: KeepStrategy) -> Value {
    let groups: Vec<Value> = report
        .groups
        .iter()
        .map(|group| {
            let kept = &group.keep_file(keep).path;
            json!({
                "hash_value": group.content_hash(),
                "size_bytes": group.size_bytes(),
                "size_human": format_size(group.size_bytes()),
                "duplicate_count": group.duplicate_count(),
                "wasted_bytes": group.wasted_bytes(),
                "wasted_human": format_size(group.wasted_bytes()),
                "files": group.files().iter().map(|f| json!({
                    "path": f.path,
                    "size_bytes": f.size_bytes,
                    "mtime": mtime_secs(f.modified),
                    "keep": &f.path == kept,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "type": "duplicates",
        "timestamp": Utc::now().to_rfc3339(),
        "scanned_paths": report.scanned_paths,
        "keep_strategy": keep.as_str(),
        "files_scanned": report.files_scanned,
        "total_wasted_bytes": report.total_wasted,
        "total_wasted_human": report.total_wasted_display(),
        "total_duplicates": report.total_duplicates(),
        "group_count": report.groups.len(),
        "groups": groups,
        "scan_errors": report.errors,
    })
}

/// 每个目标一行
pub fn write_targets_csv<W: Write>(report: &ScanReport, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "path",
        "category",
        "pattern_name",
        "size_bytes",
        "size_human",
        "file_count",
    ])?;
    for target in &report.result.targets {
        wtr.write_record([
            target.path.to_string_lossy().into_owned(),
            target.category.clone(),
            target.matched_pattern.clone(),
            target.size_bytes.to_string(),
            format_size(target.size_bytes),
            target.file_count.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// 每个重复文件一行，附带组号与处理动作
pub fn write_duplicates_csv<W: Write>(
    report: &DuplicateReport,
    keep: KeepStrategy,
    writer: W,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["group", "hash", "path", "size_bytes", "size_human", "action"])?;
    for (index, group) in report.groups.iter().enumerate() {
        let kept = &group.keep_file(keep).path;
        for file in group.files() {
            let action = if &file.path == kept { "keep" } else { "remove" };
            wtr.write_record([
                (index + 1).to_string(),
                group.content_hash().to_string(),
                file.path.to_string_lossy().into_owned(),
                file.size_bytes.to_string(),
                format_size(file.size_bytes),
                action.to_string(),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("无法创建导出文件: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_json(value: &Value, path: &Path) -> Result<()> {
    let mut out = create(path)?;
    serde_json::to_writer_pretty(&mut out, value)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// 导出目标扫描报告
pub fn export_targets(
    report: &ScanReport,
    kind: &str,
    platform: Option<&PlatformInfo>,
    format: ExportFormat,
    path: &Path,
) -> Result<()> {
    match format {
        ExportFormat::Json => write_json(&targets_to_json(report, kind, platform), path)?,
        ExportFormat::Csv => write_targets_csv(report, create(path)?)?,
    }
    tracing::info!("已导出 {} 个目标到 {}", report.result.targets.len(), path.display());
    Ok(())
}

/// 导出重复文件报告
pub fn export_duplicates(
    report: &DuplicateReport,
    keep: KeepStrategy,
    format: ExportFormat,
    path: &Path,
) -> Result<()> {
    match format {
        ExportFormat::Json => write_json(&duplicates_to_json(report, keep), path)?,
        ExportFormat::Csv => write_duplicates_csv(report, keep, create(path)?)?,
    }
    tracing::info!("已导出 {} 个重复组到 {}", report.groups.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsError;
    use crate::models::{DuplicateGroup, FileCandidate, ScanResult};
    use crate::patterns::SafetyLevel;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::tempdir;

    fn scan_report() -> ScanReport {
        ScanReport {
            scanned_paths: vec![PathBuf::from("/work")],
            result: ScanResult {
                targets: vec![Target {
                    path: PathBuf::from("/work/app/node_modules"),
                    matched_pattern: "node_modules".to_string(),
                    category: "Node.js".to_string(),
                    safety_level: SafetyLevel::Safe,
                    size_bytes: 2048,
                    file_count: 3,
                    is_directory: true,
                }],
                total_size: 2048,
                errors: vec![FsError::new(Path::new("/work/locked"), "Permission denied")],
            },
            truncation: None,
        }
    }

    fn duplicate_report() -> DuplicateReport {
        let file = |path: &str, secs: u64| FileCandidate {
            path: PathBuf::from(path),
            size_bytes: 10,
            modified: UNIX_EPOCH + Duration::from_secs(secs),
        };
        let group = DuplicateGroup::new(
            "00000000deadbeef",
            vec![file("/d/a.txt", 200), file("/d/b.txt", 100)],
        )
        .unwrap();
        DuplicateReport {
            scanned_paths: vec![PathBuf::from("/d")],
            total_wasted: group.wasted_bytes(),
            groups: vec![group],
            files_scanned: 3,
            errors: Vec::new(),
            truncation: None,
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.CSV")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("out.json")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("out")), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_targets_json_shape() {
        let value = targets_to_json(&scan_report(), "scan", None);

        assert_eq!(value["type"], "scan");
        assert_eq!(value["total_size_bytes"], 2048);
        assert_eq!(value["target_count"], 1);
        assert_eq!(value["targets"][0]["path"], "/work/app/node_modules");
        assert_eq!(value["targets"][0]["pattern_name"], "node_modules");
        assert_eq!(value["scan_errors"][0]["path"], "/work/locked");
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
        assert!(value.get("platform").is_none());
    }

    #[test]
    fn test_cache_export_carries_platform() {
        let platform = PlatformInfo {
            name: "Linux".to_string(),
            variant: "WSL (Ubuntu)".to_string(),
            home_dir: PathBuf::from("/home/dev"),
            is_wsl: true,
            wsl_distro: Some("Ubuntu".to_string()),
            windows_home: None,
            case_sensitive: true,
        };
        let value = targets_to_json(&scan_report(), "caches", Some(&platform));

        assert_eq!(value["type"], "caches");
        assert_eq!(value["platform"]["is_wsl"], true);
        assert_eq!(value["platform"]["variant"], "WSL (Ubuntu)");
    }

    #[test]
    fn test_duplicates_json_marks_kept_file() {
        let value = duplicates_to_json(&duplicate_report(), KeepStrategy::Oldest);

        assert_eq!(value["group_count"], 1);
        assert_eq!(value["total_wasted_bytes"], 10);
        assert_eq!(value["groups"][0]["files"][0]["keep"], false);
        assert_eq!(value["groups"][0]["files"][1]["keep"], true);
    }

    #[test]
    fn test_targets_csv() {
        let mut buffer = Vec::new();
        write_targets_csv(&scan_report(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "path,category,pattern_name,size_bytes,size_human,file_count");
        assert!(lines[1].starts_with("/work/app/node_modules,Node.js,node_modules,2048,"));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_duplicates_csv_actions() {
        let mut buffer = Vec::new();
        write_duplicates_csv(&duplicate_report(), KeepStrategy::First, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("1,00000000deadbeef,/d/a.txt,10,"));
        assert!(text.lines().nth(1).unwrap().ends_with(",keep"));
        assert!(text.lines().nth(2).unwrap().ends_with(",remove"));
    }

    #[test]
    fn test_export_to_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("reports").join("scan.json");

        export_targets(&scan_report(), "scan", None, ExportFormat::Json, &path).unwrap();

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["targets"][0]["size_bytes"], 2048);
    }
}
