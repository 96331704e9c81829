//! JSON document reading and writing

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xpi_template::Document;

/// Errors for document I/O
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Cannot write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Invalid JSON document: {path} ({source})")]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Expected a JSON object at the top level of {0}")]
    NotAnObject(PathBuf),
}

/// Read a JSON file whose top level is an object
pub fn read_document(path: &Path) -> Result<Document, DocumentError> {
    debug!(path = %path.display(), "Reading document");
    let contents = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value =
        serde_json::from_str(&contents).map_err(|source| DocumentError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DocumentError::NotAnObject(path.to_path_buf())),
    }
}

/// Write a document as pretty-printed JSON, creating parent directories
pub fn write_document(path: &Path, document: &Document) -> Result<(), DocumentError> {
    info!("Writing {}", path.display());
    let write_err = |source| DocumentError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut json = serde_json::to_string_pretty(document)
        .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    json.push('\n');
    fs::write(path, json).map_err(write_err)
}
