use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// 创建旋转进度指示器；`enabled` 为 false 时返回隐藏的进度条
pub fn spinner(enabled: bool, message: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let template = "{spinner:.green} [{elapsed_precise}] {msg}";
    if let Ok(style) = ProgressStyle::default_spinner().template(template) {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// 创建带总数的进度条，用于第二阶段的并行计算
pub fn bar(enabled: bool, len: u64, message: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let template = "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}";
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_message(message.to_string());
    pb
}
