pub mod cleanup;
pub mod export;

pub use cleanup::{Cleaner, CleanupItem, CleanupOptions, CleanupReport, SkippedItem};
pub use export::{export_duplicates, export_targets, ExportFormat};
