//! Build pipeline
//!
//! Turns a deployment configuration into a populated build directory.
//! Every bundle is merged in memory first; the build directory is then
//! recreated, sources and images copied in, and the generated documents
//! written last so they win over any same-named asset.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xpi_template::{derive_manifest, merge_template, ManifestError, PluginId};

use crate::assets::{copy_tree, recreate_dir, CopyError};
use crate::bundle::{BundleError, ExcludeError, ExcludeRules, PackageResult, Packager};
use crate::config::{BuildConfig, ConfigError};
use crate::deployment::{Deployment, DeploymentError};
use crate::document::{read_document, write_document, DocumentError};

/// Defaults template, relative to the templates directory
pub const DEFAULTS_TEMPLATE: &str = "defaults.tpl";
/// Manifest template, relative to the templates directory
pub const MANIFEST_TEMPLATE: &str = "manifest.tpl";
/// Locale templates directory, relative to the templates directory
pub const LOCALES_TEMPLATE_DIR: &str = "locales";
/// Image templates directory, relative to the templates directory
pub const IMAGES_TEMPLATE_DIR: &str = "images";
/// Message bundle file name inside each locale directory
pub const MESSAGES_FILE: &str = "messages.json";

/// Output names inside the build directory
pub const OUT_DEFAULTS: &str = "defaults.json";
pub const OUT_MANIFEST: &str = "manifest.json";
pub const OUT_LOCALES: &str = "_locales";
pub const OUT_IMAGES: &str = "images";

/// Errors for a build run
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error(transparent)]
    Exclude(#[from] ExcludeError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("Cannot list {path}: {source}")]
    ListDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What a build produced
#[derive(Debug)]
pub struct BuildOutcome {
    /// Identifier derived from the manifest
    pub plugin_id: PluginId,
    /// Populated build directory
    pub build_dir: PathBuf,
    /// JSON documents written, in write order
    pub documents_written: Vec<PathBuf>,
    /// Asset files copied (images and sources)
    pub assets_copied: usize,
}

/// Build pipeline over an explicit configuration
pub struct Pipeline {
    config: BuildConfig,
}

impl Pipeline {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the deployment `name` into the build directory
    pub fn run(&self, name: &str) -> Result<BuildOutcome, BuildError> {
        let config = &self.config;
        config.validate()?;
        info!(deployment = name, "Building");

        let deployment = Deployment::load(config, name)?;
        let templates = config.templates_path();
        let defaults_tpl = read_document(&templates.join(DEFAULTS_TEMPLATE))?;
        let manifest_tpl = read_document(&templates.join(MANIFEST_TEMPLATE))?;

        // Defaults decide which action slot the manifest uses
        let defaults = merge_template(defaults_tpl, deployment.defaults());
        let manifest = derive_manifest(
            manifest_tpl,
            deployment.manifest(),
            &defaults,
            config.manifest.action_type,
        )?;
        let plugin_id = PluginId::from_manifest(&manifest)?;

        // Merge every bundle before the build directory is touched
        let mut documents = vec![
            (PathBuf::from(OUT_DEFAULTS), defaults),
            (PathBuf::from(OUT_MANIFEST), manifest),
        ];
        for language in list_languages(&templates.join(LOCALES_TEMPLATE_DIR))? {
            let template = read_document(
                &templates
                    .join(LOCALES_TEMPLATE_DIR)
                    .join(&language)
                    .join(MESSAGES_FILE),
            )?;
            let messages = merge_template(template, deployment.locale(&language));
            documents.push((
                Path::new(OUT_LOCALES).join(&language).join(MESSAGES_FILE),
                messages,
            ));
        }
        let exclude = ExcludeRules::new(&config.exclude_patterns())?;

        let build_dir = config.build_path();
        recreate_dir(&build_dir)?;

        // Sources, then images, then generated documents: later layers win
        let assets_copied = self.copy_assets(&deployment, &build_dir, &exclude)?;

        let mut documents_written = Vec::with_capacity(documents.len());
        for (rel_path, document) in &documents {
            let path = build_dir.join(rel_path);
            write_document(&path, document)?;
            documents_written.push(path);
        }

        info!(plugin = %plugin_id, "Build finished");
        Ok(BuildOutcome {
            plugin_id,
            build_dir,
            documents_written,
            assets_copied,
        })
    }

    /// Build, then pack the build directory into the dist directory
    pub fn run_and_package(&self, name: &str) -> Result<(BuildOutcome, PackageResult), BuildError> {
        let outcome = self.run(name)?;
        let package = self.package(&outcome)?;
        Ok((outcome, package))
    }

    /// Pack an existing build
    pub fn package(&self, outcome: &BuildOutcome) -> Result<PackageResult, BuildError> {
        let result = Packager::new(outcome.build_dir.clone())
            .with_excludes(&self.config.exclude_patterns())?
            .write(&self.config.dist_path(), &outcome.plugin_id)?;
        Ok(result)
    }

    fn copy_assets(
        &self,
        deployment: &Deployment,
        build_dir: &Path,
        exclude: &ExcludeRules,
    ) -> Result<usize, BuildError> {
        let mut copied = 0;

        let sources = self.config.source_path();
        if sources.is_dir() {
            copied += copy_tree(&sources, build_dir, exclude)?;
        } else {
            debug!(path = %sources.display(), "No source directory, skipping");
        }

        let images_out = build_dir.join(OUT_IMAGES);
        let template_images = self.config.templates_path().join(IMAGES_TEMPLATE_DIR);
        if template_images.is_dir() {
            copied += copy_tree(&template_images, &images_out, exclude)?;
        }
        if let Some(images) = deployment.images_dir() {
            copied += copy_tree(&images, &images_out, exclude)?;
        }

        Ok(copied)
    }
}

/// Language directories under the locale templates, sorted
fn list_languages(dir: &Path) -> Result<Vec<String>, BuildError> {
    if !dir.is_dir() {
        debug!(path = %dir.display(), "No locale templates");
        return Ok(Vec::new());
    }

    let list_err = |source| BuildError::ListDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut languages = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        if entry.file_type().map_err(list_err)?.is_dir() {
            languages.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    languages.sort();
    Ok(languages)
}
