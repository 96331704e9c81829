//! Removing build artifacts

use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::info;

use crate::config::{BuildConfig, ConfigError};

/// Errors for [`clean`]
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot remove build output: {0}")]
    Io(#[from] io::Error),
}

/// Directories removed by [`clean`]
#[derive(Debug, Default)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
}

impl CleanReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Remove the build and dist directories, including the packaged archive
pub fn clean(config: &BuildConfig) -> Result<CleanReport, CleanError> {
    config.validate()?;
    let mut report = CleanReport::default();

    for dir in [config.build_path(), config.dist_path()] {
        if dir.is_dir() {
            info!("Removing directory {}", dir.display());
            fs::remove_dir_all(&dir)?;
            report.removed.push(dir);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_outputs_only() {
        let dir = TempDir::new().unwrap();
        let config = BuildConfig::with_root(dir.path());
        fs::create_dir_all(dir.path().join("build/images")).unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/a-1.xpi"), "zip").unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();

        let report = clean(&config).unwrap();

        assert_eq!(report.removed.len(), 2);
        assert!(!dir.path().join("build").exists());
        assert!(!dir.path().join("dist").exists());
        assert!(dir.path().join("templates").exists());
    }

    #[test]
    fn test_clean_nothing_to_do() {
        let dir = TempDir::new().unwrap();
        let report = clean(&BuildConfig::with_root(dir.path())).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_clean_refuses_overlapping_outputs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/background.js"), "js").unwrap();
        let mut config = BuildConfig::with_root(dir.path());
        config.dist_dir = PathBuf::from("src");

        let err = clean(&config).unwrap_err();

        assert!(matches!(err, CleanError::Config(_)));
        assert!(dir.path().join("src/background.js").is_file());
    }
}
