pub mod progress;
pub mod size_format;

pub use size_format::{format_size, parse_size};
