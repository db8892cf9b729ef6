pub mod aggregator;
pub mod duplicates;
pub mod profiles;
pub mod size_calculator;
pub mod target_scanner;
pub mod worker_pool;

pub use aggregator::{aggregate_duplicates, aggregate_targets, rank_targets, AggregateOptions};
pub use duplicates::{DuplicateDetector, DuplicateOutcome};
pub use profiles::{CacheSelection, PatternOverrides, ScanPlan};
pub use size_calculator::{measure_path, PathSize};
pub use target_scanner::{collect_candidates, ScanOutcome, TargetScanner, WalkOptions};
pub use worker_pool::{CancelToken, CompletionOutput, ParallelConfig, PoolOutput, WorkerPool};
