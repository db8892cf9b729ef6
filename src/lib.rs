pub mod config;
pub mod error;
pub mod models;
pub mod operations;
pub mod patterns;
pub mod platform;
pub mod safety;
pub mod scanner;
pub mod utils;

// 重新导出常用类型
pub use error::{FsError, ScanError};
pub use safety::{SafetyGate, SafetyPolicy};
pub use scanner::{CancelToken, DuplicateDetector, ParallelConfig, TargetScanner, WorkerPool};
