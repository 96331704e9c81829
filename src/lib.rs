//! xpi-build - build-configuration assembler for mail extension packages
//!
//! Merges template JSON documents (manifest, defaults, locale message
//! bundles) with per-deployment overrides, copies image and source assets
//! into a build directory, and packs the result into an `.xpi` archive.

pub mod assets;
pub mod bundle;
pub mod clean;
pub mod config;
pub mod deployment;
pub mod document;
pub mod pipeline;
pub mod watch;

pub use config::{BuildConfig, ConfigError};
pub use deployment::{Deployment, DeploymentError};
pub use pipeline::{BuildError, BuildOutcome, Pipeline};
pub use xpi_template::{
    derive_manifest, merge_template, ActionSlot, ActionTypePolicy, Document, ManifestError,
    PluginId,
};
