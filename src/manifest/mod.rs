// ABOUTME: Release manifest (AppInfo.json) model and loading.
// ABOUTME: Validates folder kinds, names, and kind-specific fields at load time.

mod error;
mod folder;
mod raw;

pub use error::ManifestError;
pub use folder::{APPLICATION_DIR, AppFolder, AppFolderKind};

use chrono::NaiveDateTime;
use nonempty::NonEmpty;
use std::path::Path;

use crate::types::{FolderName, ReleaseVersion};

/// File name of the manifest inside a release package.
pub const MANIFEST_FILENAME: &str = "AppInfo.json";

/// Product metadata and the ordered list of components in a release.
#[derive(Debug, Clone)]
pub struct ReleaseManifest {
    product_name: String,
    version: String,
    date_created: Option<NaiveDateTime>,
    update_executable_name: String,
    app_folders: NonEmpty<AppFolder>,
}

impl ReleaseManifest {
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let raw: raw::RawManifest = serde_json::from_str(json)?;
        raw.validate()
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        let raw: raw::RawManifest = serde_json::from_slice(bytes)?;
        raw.validate()
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&content)
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Version string exactly as declared in the manifest.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Declared version parsed for comparison, if it is dotted numeric.
    pub fn release_version(&self) -> Option<ReleaseVersion> {
        ReleaseVersion::parse(&self.version).ok()
    }

    pub fn date_created(&self) -> Option<NaiveDateTime> {
        self.date_created
    }

    pub fn update_executable_name(&self) -> &str {
        &self.update_executable_name
    }

    /// Folders in manifest order.
    pub fn folders(&self) -> impl Iterator<Item = &AppFolder> {
        self.app_folders.iter()
    }

    pub fn folder(&self, name: &str) -> Option<&AppFolder> {
        self.app_folders.iter().find(|f| f.name().as_str() == name)
    }

    /// Directory name used for this release: `<product>_<version>`.
    pub fn release_dir_name(&self) -> Result<FolderName, ManifestError> {
        let name = format!("{}_{}", self.product_name, self.version);
        FolderName::new(&name).map_err(|e| ManifestError::InvalidField {
            field: "ProductName/Version",
            reason: e.to_string(),
        })
    }

    pub(crate) fn from_parts(
        product_name: String,
        version: String,
        date_created: Option<NaiveDateTime>,
        update_executable_name: String,
        app_folders: NonEmpty<AppFolder>,
    ) -> Self {
        Self {
            product_name,
            version,
            date_created,
            update_executable_name,
            app_folders,
        }
    }
}
