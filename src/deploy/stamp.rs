// ABOUTME: Release stamp recording which release a deployed folder came from.
// ABOUTME: Read from the installed location to skip folders that are already current.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DeployError;
use crate::manifest::ReleaseManifest;
use crate::types::ReleaseVersion;

pub const RELEASE_STAMP_FILENAME: &str = ".dropship-release.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseStamp {
    pub product: String,
    pub version: String,
    pub deployed_at: DateTime<Utc>,
    pub host: String,
}

/// Reading a stamp failed in a way worth reporting.
#[derive(Debug, thiserror::Error)]
pub enum StampReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid stamp: {0}")]
    Format(#[from] serde_json::Error),
}

impl ReleaseStamp {
    pub fn for_release(manifest: &ReleaseManifest) -> Self {
        Self {
            product: manifest.product_name().to_string(),
            version: manifest.version().to_string(),
            deployed_at: Utc::now(),
            host: gethostname::gethostname().to_string_lossy().into_owned(),
        }
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(RELEASE_STAMP_FILENAME)
    }

    /// Stamp in `dir`, or `None` if there is none.
    pub fn read(dir: &Path) -> Result<Option<Self>, StampReadError> {
        match std::fs::read(Self::path_in(dir)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn write(&self, dir: &Path) -> Result<(), DeployError> {
        let path = Self::path_in(dir);
        let json = serde_json::to_vec_pretty(self).map_err(|e| DeployError::StampWrite {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;
        std::fs::write(&path, json).map_err(|source| DeployError::StampWrite { path, source })
    }

    /// True when this stamp records the same product at `manifest`'s version or newer.
    pub fn covers(&self, manifest: &ReleaseManifest) -> bool {
        if self.product != manifest.product_name() {
            return false;
        }
        match (ReleaseVersion::parse(&self.version), manifest.release_version()) {
            (Ok(installed), Some(release)) => installed >= release,
            _ => self.version == manifest.version(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(version: &str) -> ReleaseManifest {
        ReleaseManifest::from_json(&format!(
            r#"{{
                "ProductName": "Shop",
                "Version": "{version}",
                "UpdateExecutableName": "dropship",
                "AppFolders": [{{ "Name": "Assets", "TypeName": "Resource", "ConnectionStringName": "Main", "AssemblyName": "Assets.dll" }}]
            }}"#
        ))
        .unwrap()
    }

    fn stamp(product: &str, version: &str) -> ReleaseStamp {
        ReleaseStamp {
            product: product.to_string(),
            version: version.to_string(),
            deployed_at: Utc::now(),
            host: "test".to_string(),
        }
    }

    #[test]
    fn newer_or_equal_installed_version_covers_release() {
        assert!(stamp("Shop", "2.1").covers(&manifest("2.1.0")));
        assert!(stamp("Shop", "2.2").covers(&manifest("2.1.9")));
        assert!(!stamp("Shop", "2.0.9").covers(&manifest("2.1")));
    }

    #[test]
    fn other_products_never_cover() {
        assert!(!stamp("Admin", "9.0").covers(&manifest("1.0")));
    }

    #[test]
    fn unparsable_versions_compare_exactly() {
        assert!(stamp("Shop", "nightly").covers(&manifest("nightly")));
        assert!(!stamp("Shop", "nightly").covers(&manifest("beta")));
    }

    #[test]
    fn write_then_read_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReleaseStamp::read(dir.path()).unwrap().is_none());

        let written = ReleaseStamp::for_release(&manifest("3.0"));
        written.write(dir.path()).unwrap();

        assert_eq!(ReleaseStamp::read(dir.path()).unwrap(), Some(written));
    }

    #[test]
    fn corrupt_stamp_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(ReleaseStamp::path_in(dir.path()), "{").unwrap();
        assert!(matches!(
            ReleaseStamp::read(dir.path()),
            Err(StampReadError::Format(_))
        ));
    }
}
