//! Copying image and source assets into the build directory

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::bundle::ExcludeRules;

/// Errors for asset copying
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Path is not within {root}: {path}")]
    PathNotInRoot { root: PathBuf, path: PathBuf },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CopyError + '_ {
    move |source| CopyError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Remove `dir` if it exists and create it empty
pub fn recreate_dir(dir: &Path) -> Result<(), CopyError> {
    if dir.exists() {
        debug!(path = %dir.display(), "Removing directory");
        fs::remove_dir_all(dir).map_err(io_err(dir))?;
    }
    fs::create_dir_all(dir).map_err(io_err(dir))
}

/// Recursively copy `src` into `dst`, overwriting existing files.
///
/// Entries whose path relative to `src` matches `exclude` are skipped,
/// including everything below an excluded directory. Returns the number of
/// files copied.
pub fn copy_tree(src: &Path, dst: &Path, exclude: &ExcludeRules) -> Result<usize, CopyError> {
    info!("Copying {} to {}", src.display(), dst.display());
    fs::create_dir_all(dst).map_err(io_err(dst))?;

    let mut copied = 0;
    let walker = WalkDir::new(src)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_entry(|entry| match entry.path().strip_prefix(src) {
            Ok(rel) => rel.as_os_str().is_empty() || !exclude.is_excluded(rel),
            Err(_) => true,
        });

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        let rel_path = path
            .strip_prefix(src)
            .map_err(|_| CopyError::PathNotInRoot {
                root: src.to_path_buf(),
                path: path.to_path_buf(),
            })?;

        if rel_path.as_os_str().is_empty() {
            continue;
        }

        let target = dst.join(rel_path);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
        } else {
            fs::copy(path, &target).map_err(io_err(&target))?;
            copied += 1;
        }
    }

    debug!(files = copied, "Copy finished");
    Ok(copied)
}
