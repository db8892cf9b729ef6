use humansize::WINDOWS;

use crate::error::ScanError;

/// 格式化字节数为友好显示格式 (例如: "1.50 MB")
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, WINDOWS)
}

/// 解析大小字符串，例如 "1KB"、"10MB"、"1.5GB"
///
/// 没有单位时按字节处理，单位不区分大小写。
pub fn parse_size(input: &str) -> Result<u64, ScanError> {
    let normalized = input.trim().to_uppercase();

    // 先检查较长的单位，避免 "KB" 被当作 "B"
    const UNITS: [(&str, u64); 5] = [
        ("TB", 1024 * 1024 * 1024 * 1024),
        ("GB", 1024 * 1024 * 1024),
        ("MB", 1024 * 1024),
        ("KB", 1024),
        ("B", 1),
    ];

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(unit, multiplier)| {
            normalized
                .strip_suffix(unit)
                .map(|rest| (rest.trim(), *multiplier))
        })
        .unwrap_or((normalized.as_str(), 1));

    let value: f64 = number
        .parse()
        .map_err(|_| ScanError::InvalidSize(input.to_string()))?;

    if !value.is_finite() || value < 0.0 {
        return Err(ScanError::InvalidSize(input.to_string()));
    }

    Ok((value * multiplier as f64) as u64)
}
