//! Build configuration
//!
//! Three layers, later layers winning:
//! 1. Built-in defaults
//! 2. Project file (xpi-build.toml)
//! 3. CLI flags

mod defaults;
mod layered;

pub use defaults::{BuiltinDefaults, CONFIG_FILE_NAME, DEFAULT_EXCLUDES};
pub use layered::{
    BuildConfig, BundleSettings, ConfigError, ConfigOrigin, ConfigSource, ManifestSettings,
    WatchSettings,
};
