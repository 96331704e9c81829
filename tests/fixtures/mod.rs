//! Test fixtures for pipeline and packaging tests
//!
//! `tests/fixtures/project` is a small extension project with two
//! deployments: `acme` (overrides in every section, plus an image) and
//! `plain` (empty overrides).

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;
use xpi_build::BuildConfig;

/// Path to the fixture project
pub fn project_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/project")
}

/// Config rooted at the fixture project, writing outputs into `out`
pub fn fixture_config(out: &Path) -> BuildConfig {
    let mut config = BuildConfig::with_root(project_path());
    config.build_dir = out.join("build");
    config.dist_dir = out.join("dist");
    config
}

/// Read a JSON file into a value
pub fn read_json(path: &Path) -> Value {
    let contents = fs::read_to_string(path).unwrap();
    serde_json::from_str(&contents).unwrap()
}

/// Write a minimal project into a fresh temp dir
///
/// `manifest` is written verbatim as the manifest template.
pub fn scratch_project(manifest: &str, overrides: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("templates")).unwrap();
    fs::write(
        root.join("templates/defaults.tpl"),
        r#"{"use_toolbar_button": true, "spam_report_enabled": false}"#,
    )
    .unwrap();
    fs::write(root.join("templates/manifest.tpl"), manifest).unwrap();

    fs::create_dir_all(root.join("configs/test")).unwrap();
    fs::write(root.join("configs/test/overrides.json"), overrides).unwrap();

    dir
}
