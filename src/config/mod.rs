pub mod defaults;
pub mod settings;

pub use defaults::{DefaultConfig, CONFIG_TEMPLATE};
pub use settings::{
    CachesConfig, Config, DefaultsConfig, DuplicatesConfig, PackagesConfig, ParallelSettings,
    PatternsConfig, ScanConfig,
};
