pub mod detect;

pub use detect::{CacheRoot, CacheRootKind, PlatformInfo};
