// ABOUTME: Installer error types with SNAFU context selectors.
// ABOUTME: Filesystem failures carry the path they happened on.

use std::path::PathBuf;
use std::process::ExitStatus;

use snafu::Snafu;

use crate::manifest::{MANIFEST_FILENAME, ManifestError};
use crate::outcome::FailureKind;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InstallError {
    #[snafu(display("integrity key does not match"))]
    IntegrityKeyMismatch,

    #[snafu(display("package payload is empty"))]
    EmptyPayload,

    #[snafu(display("package payload is not a readable zip archive: {source}"))]
    Archive { source: zip::result::ZipError },

    #[snafu(display("package manifest is invalid: {source}"))]
    Manifest { source: ManifestError },

    #[snafu(display("package {MANIFEST_FILENAME} is larger than {limit} bytes"))]
    ManifestTooLarge { limit: u64 },

    #[snafu(display("extraction into {} did not finish: {source}", path.display()))]
    ExtractTask {
        path: PathBuf,
        source: tokio::task::JoinError,
    },

    #[snafu(display(
        "package has no {MANIFEST_FILENAME}; its files were extracted to {} for inspection",
        quarantine.display()
    ))]
    ManifestMissing { quarantine: PathBuf },

    #[snafu(display("failed to create {}: {source}", path.display()))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to save package as {}: {source}", path.display()))]
    PersistPackage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to extract package into {}: {source}", path.display()))]
    Extract {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[snafu(display("update executable {name} not found under {}", dir.display()))]
    ExecutableNotFound { name: String, dir: PathBuf },

    #[snafu(display("failed to launch {}: {source}", path.display()))]
    Launch {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{} exited with {status}", path.display()))]
    ExecutableFailed { path: PathBuf, status: ExitStatus },
}

impl InstallError {
    /// Whether the extracted release was removed because of this error.
    pub fn rolled_back(&self) -> bool {
        matches!(
            self,
            InstallError::ExecutableNotFound { .. }
                | InstallError::Launch { .. }
                | InstallError::ExecutableFailed { .. }
        )
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            InstallError::IntegrityKeyMismatch
            | InstallError::EmptyPayload
            | InstallError::Archive { .. }
            | InstallError::Manifest { .. }
            | InstallError::ManifestTooLarge { .. }
            | InstallError::ManifestMissing { .. }
            | InstallError::ExecutableNotFound { .. } => FailureKind::Validation,
            InstallError::CreateDir { .. }
            | InstallError::PersistPackage { .. }
            | InstallError::Extract { .. }
            | InstallError::ExtractTask { .. } => FailureKind::HostOperation,
            InstallError::Launch { .. } | InstallError::ExecutableFailed { .. } => {
                FailureKind::Process
            }
        }
    }
}
