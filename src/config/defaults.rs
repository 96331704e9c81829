//! Built-in build defaults (layer 1)
//!
//! Hardcoded defaults for every build configuration value.

use serde::{Deserialize, Serialize};
use xpi_template::{ActionTypePolicy, Document};

/// Name of the optional project configuration file.
pub const CONFIG_FILE_NAME: &str = "xpi-build.toml";

/// Files never copied into the build directory or packed into the archive.
pub const DEFAULT_EXCLUDES: &[&str] = &[".DS_Store", "**/.DS_Store", "**/*.swp", "**/*~"];

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Template directory (default: "templates")
    pub templates_dir: String,

    /// Deployment configurations directory (default: "configs")
    pub configs_dir: String,

    /// Extension sources copied verbatim into the build (default: "src")
    pub source_dir: String,

    /// Build output directory (default: "build")
    pub build_dir: String,

    /// Archive output directory (default: "dist")
    pub dist_dir: String,

    /// Action type policy (default: unchanged)
    pub action_type: ActionTypePolicy,

    /// Exclusion globs for copying and packaging
    pub exclude: Vec<String>,

    /// Watch debounce in milliseconds (default: 300)
    pub debounce_ms: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            templates_dir: "templates".to_string(),
            configs_dir: "configs".to_string(),
            source_dir: "src".to_string(),
            build_dir: "build".to_string(),
            dist_dir: "dist".to_string(),
            action_type: ActionTypePolicy::Unchanged,
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            debounce_ms: 300,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a document for layering
    pub fn to_document(&self) -> Document {
        let value = serde_json::json!({
            "templates_dir": self.templates_dir,
            "configs_dir": self.configs_dir,
            "source_dir": self.source_dir,
            "build_dir": self.build_dir,
            "dist_dir": self.dist_dir,
            "manifest": {
                "action_type": self.action_type
            },
            "bundle": {
                "exclude": self.exclude
            },
            "watch": {
                "debounce_ms": self.debounce_ms
            }
        });
        match value {
            serde_json::Value::Object(map) => map,
            _ => Document::new(),
        }
    }
}
