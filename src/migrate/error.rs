// ABOUTME: Error types for schema migration.
// ABOUTME: Load-time configuration errors, hook failures, and SQL executor errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::hooks::HookError;
use crate::types::{ScriptVersion, VersionError};

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("script '{script}' has an invalid version prefix: {source}")]
    InvalidScriptVersion {
        script: String,
        #[source]
        source: VersionError,
    },

    #[error("scripts '{first}' and '{second}' share version {version}")]
    DuplicateVersion {
        version: ScriptVersion,
        first: String,
        second: String,
    },

    #[error("script '{0}' is registered twice")]
    DuplicateScript(String),

    #[error("failed to read migration scripts from {path}: {source}")]
    ReadScripts {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Failure reported by a SQL executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Rejected(String),
}
