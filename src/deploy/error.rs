// ABOUTME: Error types for deployment operations.
// ABOUTME: Unexpected conditions only; expected failures are reported as outcomes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::manifest::ManifestError;
use crate::migrate::MigrateError;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Migrate(#[from] MigrateError),

    #[error("no {manifest} found in {} or its parents", .start.display())]
    ReleaseNotFound {
        manifest: &'static str,
        start: PathBuf,
    },

    #[error("failed to write release stamp {}: {source}", .path.display())]
    StampWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another deployment holds the lock.
    #[error("deployment already running on {holder} (pid {pid}) since {started_at}")]
    LockHeld {
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    #[error("deploy lock error: {0}")]
    Lock(String),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Manifest,
    Migration,
    Filesystem,
    Lock,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Manifest(_) | DeployError::ReleaseNotFound { .. } => {
                DeployErrorKind::Manifest
            }
            DeployError::Migrate(_) => DeployErrorKind::Migration,
            DeployError::StampWrite { .. } => DeployErrorKind::Filesystem,
            DeployError::LockHeld { .. } | DeployError::Lock(_) => DeployErrorKind::Lock,
        }
    }
}
