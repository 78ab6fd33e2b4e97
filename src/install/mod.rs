// ABOUTME: PackageInstaller: validates, extracts, persists, and launches a release package.
// ABOUTME: A failed launch removes the extracted tree; the raw package is kept.

mod archive;
mod error;
mod release_dir;

pub use archive::{MAX_MANIFEST_SIZE, extract, find_executable, read_manifest};
pub use error::InstallError;
pub use release_dir::{
    COLLISION_SUFFIX_FORMAT, UNIDENTIFIED_PREFIX, package_path, quarantine_dir, unique_release_dir,
};

use std::path::{Path, PathBuf};

use bytes::Bytes;
use snafu::{OptionExt, ResultExt, ensure};
use tokio::process::Command;

use crate::manifest::ReleaseManifest;
use crate::transport::UpdatePackage;
use error::{
    EmptyPayloadSnafu, ExecutableFailedSnafu, ExecutableNotFoundSnafu, ExtractTaskSnafu,
    IntegrityKeyMismatchSnafu, LaunchSnafu, ManifestMissingSnafu, ManifestSnafu,
    PersistPackageSnafu,
};

/// Argument passed to the update executable.
pub const FULL_UPDATE_ARG: &str = "fullupdate";

/// A release that was extracted and whose update executable exited cleanly.
#[derive(Debug, Clone)]
pub struct InstalledRelease {
    pub manifest: ReleaseManifest,
    pub release_dir: PathBuf,
    pub package_path: PathBuf,
    pub executable: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PackageInstaller {
    integrity_key: String,
    base_path: PathBuf,
}

impl PackageInstaller {
    pub fn new(integrity_key: impl Into<String>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            integrity_key: integrity_key.into(),
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Install one package end to end.
    ///
    /// Key and payload checks happen before anything is written. A package
    /// without a manifest is extracted into an `unidentified_` directory and
    /// reported as [`InstallError::ManifestMissing`].
    pub async fn install(&self, package: &UpdatePackage) -> Result<InstalledRelease, InstallError> {
        ensure!(
            package.integrity_key == self.integrity_key,
            IntegrityKeyMismatchSnafu
        );
        ensure!(!package.payload.is_empty(), EmptyPayloadSnafu);

        let payload = package.payload.as_ref();
        let Some(manifest) = read_manifest(payload)? else {
            let quarantine = quarantine_dir(&self.base_path);
            persist(payload, &quarantine).await?;
            extract_off_runtime(&package.payload, &quarantine).await?;
            tracing::error!(dir = %quarantine.display(), "package carried no manifest");
            return ManifestMissingSnafu { quarantine }.fail();
        };

        let name = manifest.release_dir_name().context(ManifestSnafu)?;
        let release_dir = unique_release_dir(&self.base_path, name.as_str());
        let package_path = persist(payload, &release_dir).await?;
        extract_off_runtime(&package.payload, &release_dir).await?;
        tracing::info!(
            product = manifest.product_name(),
            version = manifest.version(),
            dir = %release_dir.display(),
            "release extracted"
        );

        match launch(&release_dir, manifest.update_executable_name()).await {
            Ok(executable) => Ok(InstalledRelease {
                manifest,
                release_dir,
                package_path,
                executable,
            }),
            Err(err) => {
                tracing::error!(error = %err, dir = %release_dir.display(), "update failed, removing release");
                if let Err(cleanup) = tokio::fs::remove_dir_all(&release_dir).await {
                    tracing::warn!(error = %cleanup, dir = %release_dir.display(), "failed to remove release directory");
                }
                Err(err)
            }
        }
    }
}

async fn persist(payload: &[u8], dir: &Path) -> Result<PathBuf, InstallError> {
    let path = package_path(dir);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context(PersistPackageSnafu { path: &path })?;
    }
    tokio::fs::write(&path, payload)
        .await
        .context(PersistPackageSnafu { path: &path })?;
    tracing::debug!(path = %path.display(), "package persisted");
    Ok(path)
}

/// Run [`extract`] on the blocking pool; payloads can be hundreds of megabytes.
async fn extract_off_runtime(payload: &Bytes, dir: &Path) -> Result<(), InstallError> {
    let payload = payload.clone();
    let target = dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract(&payload, &target))
        .await
        .context(ExtractTaskSnafu { path: dir })?
}

async fn launch(release_dir: &Path, name: &str) -> Result<PathBuf, InstallError> {
    let executable = find_executable(release_dir, name).context(ExecutableNotFoundSnafu {
        name,
        dir: release_dir,
    })?;
    let work_dir = executable.parent().unwrap_or(release_dir);

    tracing::info!(executable = %executable.display(), "running update executable");
    let status = Command::new(&executable)
        .arg(FULL_UPDATE_ARG)
        .current_dir(work_dir)
        .status()
        .await
        .context(LaunchSnafu { path: &executable })?;

    ensure!(
        status.success(),
        ExecutableFailedSnafu {
            path: &executable,
            status
        }
    );
    Ok(executable)
}
