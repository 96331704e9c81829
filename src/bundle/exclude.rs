//! Exclusion rules for copying and packaging
//!
//! Patterns are globs matched against paths relative to the walked root,
//! using `/` as separator on every platform.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

use crate::config::DEFAULT_EXCLUDES;

/// Errors for exclusion rules
#[derive(Debug, thiserror::Error)]
pub enum ExcludeError {
    #[error("Glob pattern error: {0}")]
    GlobError(#[from] globset::Error),
}

/// Exclusion rules for filtering files
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    glob_set: GlobSet,
    patterns: Vec<String>,
}

impl ExcludeRules {
    /// Rules excluding nothing
    pub fn none() -> Self {
        Self {
            glob_set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Rules built from the built-in default patterns
    pub fn defaults() -> Result<Self, ExcludeError> {
        Self::new(DEFAULT_EXCLUDES)
    }

    /// Rules built from the given patterns; empty patterns are ignored
    pub fn new(patterns: &[&str]) -> Result<Self, ExcludeError> {
        Self::none().with_patterns(patterns)
    }

    /// Add additional patterns
    pub fn with_patterns(self, patterns: &[&str]) -> Result<Self, ExcludeError> {
        let mut all = self.patterns;
        all.extend(
            patterns
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| p.to_string()),
        );

        let mut builder = GlobSetBuilder::new();
        for pattern in &all {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            glob_set: builder.build()?,
            patterns: all,
        })
    }

    /// Patterns currently in effect
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check if a relative path should be excluded
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.glob_set.is_match(slash_path(path))
    }
}

/// Render a relative path with `/` separators
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
