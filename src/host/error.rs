// ABOUTME: Error types for host collaborators.
// ABOUTME: Config file problems, utility process failures, and refused host operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::outcome::FailureKind;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("configuration file {} not found", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to parse configuration file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {output}", exit_code(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("unexpected output from {program}: {reason}")]
    BadOutput { program: String, reason: String },

    #[error("{0}")]
    Rejected(String),
}

impl HostError {
    /// Failure category reported on an outcome.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            HostError::Spawn { .. } | HostError::CommandFailed { .. } => FailureKind::Process,
            _ => FailureKind::HostOperation,
        }
    }
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}
