//! Layered build configuration with provenance
//!
//! The build configuration is the merge of the built-in defaults, the
//! optional project file and CLI overrides, plus a record of where each
//! contributing layer came from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use xpi_template::{merge_layers, ActionTypePolicy, Document};

use super::defaults::{BuiltinDefaults, CONFIG_FILE_NAME};

/// Origin of a configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing config layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this layer
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Manifest derivation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestSettings {
    #[serde(default)]
    pub action_type: ActionTypePolicy,
}

/// Packaging and copy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleSettings {
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Watch mode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    pub debounce_ms: u64,
}

/// Everything the build pipeline needs to know, passed explicitly.
///
/// Directory fields may be relative; [`BuildConfig::resolve`] anchors them
/// at the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Project root all relative paths resolve against
    #[serde(skip)]
    pub root: PathBuf,

    pub templates_dir: PathBuf,
    pub configs_dir: PathBuf,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub manifest: ManifestSettings,
    pub bundle: BundleSettings,
    pub watch: WatchSettings,

    /// Contributing layers in precedence order
    #[serde(skip)]
    pub sources: Vec<ConfigSource>,
}

impl BuildConfig {
    /// Built-in defaults only, rooted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            root: root.into(),
            templates_dir: PathBuf::from(defaults.templates_dir),
            configs_dir: PathBuf::from(defaults.configs_dir),
            source_dir: PathBuf::from(defaults.source_dir),
            build_dir: PathBuf::from(defaults.build_dir),
            dist_dir: PathBuf::from(defaults.dist_dir),
            manifest: ManifestSettings {
                action_type: defaults.action_type,
            },
            bundle: BundleSettings {
                exclude: defaults.exclude,
            },
            watch: WatchSettings {
                debounce_ms: defaults.debounce_ms,
            },
            sources: vec![ConfigSource {
                origin: ConfigOrigin::Builtin,
                path: None,
                digest: None,
            }],
        }
    }

    /// Load the layered configuration.
    ///
    /// An explicit `config_file` must exist. Without one, `xpi-build.toml` in
    /// the project root is used when present.
    pub fn load(
        root: &Path,
        config_file: Option<&Path>,
        cli_overrides: Option<Document>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        layers.push(BuiltinDefaults::default().to_document());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layer 2: Project file
        let file = match config_file {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root.join(path)
                };
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path));
                }
                Some(path)
            }
            None => Some(root.join(CONFIG_FILE_NAME)).filter(|p| p.is_file()),
        };
        if let Some(path) = file {
            debug!(path = %path.display(), "Loading build configuration file");
            let (doc, digest) = load_toml_file(&path)?;
            layers.push(doc);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        // Layer 3: CLI overrides
        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let mut config: BuildConfig = serde_json::from_value(Value::Object(merged))
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        config.root = root.to_path_buf();
        config.validate()?;

        config.sources = sources;
        Ok(config)
    }

    /// Check that the output directories cannot clobber project inputs
    ///
    /// Both outputs are wiped on every build and by `clean`, so neither may
    /// equal or contain the project root or an input directory, sit inside
    /// an input directory, or overlap the other output. Paths are compared
    /// lexically after anchoring at the root.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let outputs = [
            ("build_dir", &self.build_dir),
            ("dist_dir", &self.dist_dir),
        ];
        for (key, dir) in outputs {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} must not be empty",
                    key
                )));
            }
        }

        let build = normalize(&self.build_path());
        let dist = normalize(&self.dist_path());
        let root = normalize(&self.root);
        let inputs = [
            ("templates_dir", normalize(&self.templates_path())),
            ("configs_dir", normalize(&self.configs_path())),
            ("source_dir", normalize(&self.source_path())),
        ];
        for (key, output) in [("build_dir", &build), ("dist_dir", &dist)] {
            if root.starts_with(output) {
                return Err(ConfigError::ValidationError(format!(
                    "{} ({}) must not contain the project root",
                    key,
                    output.display()
                )));
            }
            for (input_key, input) in &inputs {
                if input.starts_with(output) || output.starts_with(input) {
                    return Err(ConfigError::ValidationError(format!(
                        "{} ({}) overlaps {} ({})",
                        key,
                        output.display(),
                        input_key,
                        input.display()
                    )));
                }
            }
        }

        if build == dist {
            return Err(ConfigError::ValidationError(
                "build_dir and dist_dir must differ".to_string(),
            ));
        }
        if build.starts_with(&dist) || dist.starts_with(&build) {
            return Err(ConfigError::ValidationError(
                "build_dir and dist_dir must not be nested".to_string(),
            ));
        }
        Ok(())
    }

    /// Anchor a possibly relative path at the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn templates_path(&self) -> PathBuf {
        self.resolve(&self.templates_dir)
    }

    pub fn configs_path(&self) -> PathBuf {
        self.resolve(&self.configs_dir)
    }

    pub fn source_path(&self) -> PathBuf {
        self.resolve(&self.source_dir)
    }

    pub fn build_path(&self) -> PathBuf {
        self.resolve(&self.build_dir)
    }

    pub fn dist_path(&self) -> PathBuf {
        self.resolve(&self.dist_dir)
    }

    /// Exclusion patterns as string slices
    pub fn exclude_patterns(&self) -> Vec<&str> {
        self.bundle.exclude.iter().map(String::as_str).collect()
    }
}

/// Drop `.` components and fold `..` into its parent, without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Load and parse a TOML file, returning the document and digest
fn load_toml_file(path: &Path) -> Result<(Document, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

    let table: toml::Table = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    let doc = table
        .into_iter()
        .map(|(k, v)| (k, toml_to_json(v)))
        .collect();

    Ok((doc, digest))
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
