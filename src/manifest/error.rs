// ABOUTME: Errors raised while loading and validating a release manifest.
// ABOUTME: Every variant is a validation failure of the package contents.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown folder type '{type_name}' for folder '{folder}'")]
    UnknownFolderType { folder: String, type_name: String },

    #[error("folder '{folder}' is missing required field {field}")]
    MissingField { folder: String, field: &'static str },

    #[error("folder name '{0}' appears more than once")]
    DuplicateFolder(String),

    #[error("manifest declares no folders")]
    NoFolders,

    #[error("manifest field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
