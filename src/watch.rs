//! Watch mode for automatic rebuilds on file changes
//!
//! Watches the templates, the deployment directory and the sources, and
//! reruns the build pipeline after each debounced batch of changes. A failed
//! build is logged and watching continues. Ctrl+C ends the loop.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::pipeline::Pipeline;

/// How often the loop checks for Ctrl+C while idle
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Errors during watch mode
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(notify::Error),

    #[error("Failed to watch {path}: {source}")]
    WatchPath { path: PathBuf, source: notify::Error },

    #[error("Failed to install Ctrl+C handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),

    #[error("Watch channel error: {0}")]
    ChannelError(String),
}

/// Directories whose changes trigger a rebuild, if they exist
pub fn watched_paths(pipeline: &Pipeline, deployment: &str) -> Vec<PathBuf> {
    let config = pipeline.config();
    [
        config.templates_path(),
        config.configs_path().join(deployment),
        config.source_path(),
    ]
    .into_iter()
    .filter(|p| p.exists())
    .collect()
}

/// Whether a changed path should trigger a rebuild.
///
/// Changes inside the build output directories never do.
pub fn is_relevant(path: &Path, outputs: &[PathBuf]) -> bool {
    !outputs.iter().any(|out| path.starts_with(out))
}

fn rebuild(pipeline: &Pipeline, deployment: &str) {
    let start = Instant::now();
    match pipeline.run(deployment) {
        Ok(outcome) => info!(
            plugin = %outcome.plugin_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Rebuilt"
        ),
        Err(e) => error!("Build failed: {}", e),
    }
}

/// Build once, then rebuild on every change until Ctrl+C.
pub fn watch(pipeline: &Pipeline, deployment: &str) -> Result<(), WatchError> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })?;

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(pipeline.config().watch.debounce_ms);
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;

    let paths = watched_paths(pipeline, deployment);
    for path in &paths {
        debouncer
            .watcher()
            .watch(path, RecursiveMode::Recursive)
            .map_err(|source| WatchError::WatchPath {
                path: path.clone(),
                source,
            })?;
    }

    rebuild(pipeline, deployment);

    // Event paths are absolute; compare against canonical output paths
    let outputs: Vec<PathBuf> = [pipeline.config().build_path(), pipeline.config().dist_path()]
        .into_iter()
        .map(|p| p.canonicalize().unwrap_or(p))
        .collect();
    info!("Watching {} directories for changes (Ctrl+C to stop)", paths.len());

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(events)) => {
                let changed: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        matches!(e.kind, DebouncedEventKind::Any) && is_relevant(&e.path, &outputs)
                    })
                    .collect();

                if changed.is_empty() {
                    continue;
                }
                for event in &changed {
                    info!("Changed: {}", event.path.display());
                }
                rebuild(pipeline, deployment);
            }
            Ok(Err(e)) => {
                warn!("Watch error: {:?}", e);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(WatchError::ChannelError("watcher disconnected".to_string()));
            }
        }
    }

    info!("Stopped watching");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_relevant() {
        let outputs = [PathBuf::from("/p/build"), PathBuf::from("/p/dist")];

        assert!(is_relevant(Path::new("/p/templates/manifest.tpl"), &outputs));
        assert!(is_relevant(Path::new("/p/src/background.js"), &outputs));
        assert!(!is_relevant(Path::new("/p/build/manifest.json"), &outputs));
        assert!(!is_relevant(Path::new("/p/dist/a-1.xpi"), &outputs));
        // Component-wise prefix, not string prefix
        assert!(is_relevant(Path::new("/p/builder/x"), &outputs));
    }

    #[test]
    fn test_watched_paths_existing_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::create_dir_all(dir.path().join("configs/acme")).unwrap();
        let pipeline = Pipeline::new(BuildConfig::with_root(dir.path()));

        let paths = watched_paths(&pipeline, "acme");

        assert_eq!(
            paths,
            vec![dir.path().join("templates"), dir.path().join("configs/acme")]
        );
    }
}
