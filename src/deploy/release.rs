// ABOUTME: An extracted release on disk: its manifest plus the directory it lives in.
// ABOUTME: Can be located by searching upwards from the update executable's directory.

use std::path::{Path, PathBuf};

use super::DeployError;
use crate::manifest::{AppFolder, MANIFEST_FILENAME, ReleaseManifest};

#[derive(Debug, Clone)]
pub struct Release {
    manifest: ReleaseManifest,
    root: PathBuf,
}

impl Release {
    pub fn new(manifest: ReleaseManifest, root: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            root: root.into(),
        }
    }

    /// Load the release whose manifest sits directly in `root`.
    pub fn load(root: &Path) -> Result<Self, DeployError> {
        let manifest = ReleaseManifest::load(&root.join(MANIFEST_FILENAME))?;
        Ok(Self::new(manifest, root))
    }

    /// Load the nearest release at or above `start`.
    pub fn discover(start: &Path) -> Result<Self, DeployError> {
        start
            .ancestors()
            .find(|dir| dir.join(MANIFEST_FILENAME).is_file())
            .ok_or_else(|| DeployError::ReleaseNotFound {
                manifest: MANIFEST_FILENAME,
                start: start.to_path_buf(),
            })
            .and_then(Self::load)
    }

    pub fn manifest(&self) -> &ReleaseManifest {
        &self.manifest
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `folder`'s new files live in this release.
    pub fn folder_path(&self, folder: &AppFolder) -> PathBuf {
        folder.update_path(&self.root)
    }

    /// `<product> <version>` for messages.
    pub fn label(&self) -> String {
        format!("{} {}", self.manifest.product_name(), self.manifest.version())
    }
}
