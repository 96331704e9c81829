//! Packaging the build directory into a distributable archive
//!
//! Creates a canonical `.xpi` (zip) archive: entries in sorted path order,
//! `/` separators, fixed timestamps and permissions, so identical build
//! directories produce byte-identical archives.

mod exclude;

pub use exclude::{slash_path, ExcludeError, ExcludeRules};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use xpi_template::PluginId;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Errors for packaging operations
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Exclude rules error: {0}")]
    ExcludeError(#[from] ExcludeError),

    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Path is not within build directory: {0}")]
    PathNotInBuild(PathBuf),

    #[error("Build directory {0} does not exist; run a build first")]
    MissingBuild(PathBuf),
}

/// One file stored in the archive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageEntry {
    /// Archive path with `/` separators
    pub path: String,
    /// Uncompressed size in bytes
    pub size: u64,
    /// SHA-256 of the uncompressed contents
    pub sha256: String,
}

/// Packer for the build directory
pub struct Packager {
    /// Build directory to pack
    root: PathBuf,
    /// Exclusion rules
    exclude: ExcludeRules,
}

impl Packager {
    /// Create a packager for the given build directory
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            exclude: ExcludeRules::none(),
        }
    }

    /// Add exclusion patterns
    pub fn with_excludes(mut self, patterns: &[&str]) -> Result<Self, BundleError> {
        self.exclude = self.exclude.with_patterns(patterns)?;
        Ok(self)
    }

    /// Collect all files to pack, keyed by archive path
    fn collect_entries(&self) -> Result<BTreeMap<String, PathBuf>, BundleError> {
        if !self.root.is_dir() {
            return Err(BundleError::MissingBuild(self.root.clone()));
        }

        let mut entries = BTreeMap::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let rel_path = path
                .strip_prefix(&self.root)
                .map_err(|_| BundleError::PathNotInBuild(path.to_path_buf()))?;

            if self.exclude.is_excluded(rel_path) {
                debug!(path = %rel_path.display(), "Excluded from archive");
                continue;
            }

            entries.insert(slash_path(rel_path), path.to_path_buf());
        }

        Ok(entries)
    }

    /// Write the archive for `plugin_id` into a freshly recreated `dist_dir`
    pub fn write(&self, dist_dir: &Path, plugin_id: &PluginId) -> Result<PackageResult, BundleError> {
        let entries = self.collect_entries()?;

        if dist_dir.exists() {
            fs::remove_dir_all(dist_dir)?;
        }
        fs::create_dir_all(dist_dir)?;
        let target = dist_dir.join(plugin_id.archive_name());

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut package_entries = Vec::with_capacity(entries.len());
        {
            let mut zip = ZipWriter::new(File::create(&target)?);

            // BTreeMap iteration keeps entries sorted
            for (name, full_path) in &entries {
                let contents = fs::read(full_path)?;

                zip.start_file(name.as_str(), options)?;
                zip.write_all(&contents)?;

                package_entries.push(PackageEntry {
                    path: name.clone(),
                    size: contents.len() as u64,
                    sha256: sha256_hex(&contents),
                });
            }

            zip.finish()?;
        }

        let sha256 = sha256_hex(&fs::read(&target)?);
        info!("Plugin archive written to {}", target.display());

        Ok(PackageResult {
            path: target,
            entries: package_entries,
            sha256,
        })
    }
}

/// Result of writing an archive
#[derive(Debug)]
pub struct PackageResult {
    /// Location of the archive
    pub path: PathBuf,
    /// Stored files in archive order
    pub entries: Vec<PackageEntry>,
    /// SHA-256 of the archive bytes
    pub sha256: String,
}

impl PackageResult {
    /// Archive size in bytes
    pub fn size(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
