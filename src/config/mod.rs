//! Configuration models: settings snapshots, work-type quotas and scheduler options.

pub mod concurrency;
pub mod settings;
pub mod work_type_config;

pub use concurrency::{
    ConcurrencyConfig, PackageLimits, DEFAULT_PKG_CONCURRENCY_LIMIT_EJ,
    DEFAULT_PKG_CONCURRENCY_LIMIT_REGULAR, KEY_PKG_CONCURRENCY_LIMIT_EJ,
    KEY_PKG_CONCURRENCY_LIMIT_REGULAR,
};
pub use settings::DeviceSettings;
pub use work_type_config::{
    ConfigProfile, MemoryLevel, WorkTypeConfig, WorkTypeConfigSet, KEY_PREFIX_MAX,
    KEY_PREFIX_MAX_TOTAL, KEY_PREFIX_MIN, STANDARD_CONCURRENCY_LIMIT,
};
