//! Deployment configurations
//!
//! A deployment is a directory under `configs/` holding an `overrides.json`
//! and, optionally, an `images/` directory whose files replace or extend the
//! template images.

use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use xpi_template::Document;

use crate::config::BuildConfig;
use crate::document::{read_document, DocumentError};

/// Override file inside a deployment directory
pub const OVERRIDES_FILE: &str = "overrides.json";

/// Image override directory inside a deployment directory
pub const IMAGES_DIR: &str = "images";

/// Sections of `overrides.json`
const SECTIONS: &[&str] = &["defaults", "manifest", "locales"];

/// Errors for loading a deployment
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("The deployment configuration directory ({0}) does not exist")]
    NotFound(PathBuf),

    #[error("Invalid deployment name \"{0}\": expected a single directory name")]
    InvalidName(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Section \"{section}\" of {path} must be an object")]
    MalformedSection { section: String, path: PathBuf },
}

/// A loaded deployment configuration
#[derive(Debug, Clone)]
pub struct Deployment {
    name: String,
    dir: PathBuf,
    overrides: Document,
}

impl Deployment {
    /// Load the deployment `name` from the configured deployments directory
    pub fn load(config: &BuildConfig, name: &str) -> Result<Self, DeploymentError> {
        Self::check_name(name)?;
        let dir = config.configs_path().join(name);
        if !dir.is_dir() {
            return Err(DeploymentError::NotFound(dir));
        }

        let path = dir.join(OVERRIDES_FILE);
        let overrides = read_document(&path)?;
        Self::check_sections(&overrides, &path)?;
        debug!(deployment = name, "Loaded overrides");

        Ok(Self {
            name: name.to_string(),
            dir,
            overrides,
        })
    }

    /// A name must be one plain path component inside the deployments directory
    fn check_name(name: &str) -> Result<(), DeploymentError> {
        let mut components = Path::new(name).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single || name.contains(['/', '\\']) {
            return Err(DeploymentError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    fn check_sections(overrides: &Document, path: &Path) -> Result<(), DeploymentError> {
        for section in SECTIONS {
            if let Some(value) = overrides.get(*section) {
                if !value.is_object() {
                    return Err(DeploymentError::MalformedSection {
                        section: section.to_string(),
                        path: path.to_path_buf(),
                    });
                }
            }
        }
        if let Some(Value::Object(locales)) = overrides.get("locales") {
            for (language, value) in locales {
                if !value.is_object() {
                    return Err(DeploymentError::MalformedSection {
                        section: format!("locales.{}", language),
                        path: path.to_path_buf(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overrides for the defaults template
    pub fn defaults(&self) -> Document {
        self.section("defaults")
    }

    /// Overrides for the manifest template
    pub fn manifest(&self) -> Document {
        self.section("manifest")
    }

    /// Overrides for one language's message bundle
    pub fn locale(&self, language: &str) -> Document {
        self.overrides
            .get("locales")
            .and_then(|locales| locales.get(language))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Image override directory, if the deployment has one
    pub fn images_dir(&self) -> Option<PathBuf> {
        Some(self.dir.join(IMAGES_DIR)).filter(|p| p.is_dir())
    }

    fn section(&self, name: &str) -> Document {
        self.overrides
            .get(name)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}
