// ABOUTME: Application-wide error type for dropship commands.
// ABOUTME: Wraps module errors with thiserror; outcome failures carry their message.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::host::HostError;
use crate::install::InstallError;
use crate::migrate::MigrateError;
use crate::outcome::FailureKind;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("only .zip packages can be pushed: {0}")]
    NotAZip(PathBuf),

    #[error("{kind} failure: {message}")]
    Failed { kind: FailureKind, message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Migrate(#[from] MigrateError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
