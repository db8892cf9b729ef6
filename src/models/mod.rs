pub mod duplicate;
pub mod scan_result;
pub mod target;

pub use duplicate::{DuplicateGroup, FileCandidate, KeepStrategy};
pub use scan_result::{CategoryTotal, DuplicateReport, ScanReport, ScanResult, TruncationNotice};
pub use target::{Candidate, Target};
