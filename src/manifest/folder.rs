// ABOUTME: AppFolder: one deployable unit of a release and its on-disk layout.
// ABOUTME: The folder kind is a closed enum carrying kind-specific settings.

use std::path::{Path, PathBuf};

use crate::types::FolderName;

/// Directory inside an extracted release that holds one subtree per folder.
pub const APPLICATION_DIR: &str = "Application";

const WEB_CONFIG_FILENAME: &str = "web.config";
const WEB_BIN_DIR: &str = "bin";

/// How a folder is brought up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppFolderKind {
    /// Web application hosted by the web server.
    Web {
        application_name: String,
        pool_name: String,
    },
    /// Background service registered with the OS.
    Service { service_name: String },
    /// Anything else; only its configuration is touched.
    Resource,
}

impl AppFolderKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            AppFolderKind::Web { .. } => "Web",
            AppFolderKind::Service { .. } => "Service",
            AppFolderKind::Resource => "Resource",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFolder {
    name: FolderName,
    kind: AppFolderKind,
    connection_string_name: String,
    assembly_name: String,
}

impl AppFolder {
    pub fn new(
        name: FolderName,
        kind: AppFolderKind,
        connection_string_name: impl Into<String>,
        assembly_name: impl Into<String>,
    ) -> Self {
        Self {
            name,
            kind,
            connection_string_name: connection_string_name.into(),
            assembly_name: assembly_name.into(),
        }
    }

    pub fn name(&self) -> &FolderName {
        &self.name
    }

    pub fn kind(&self) -> &AppFolderKind {
        &self.kind
    }

    pub fn connection_string_name(&self) -> &str {
        &self.connection_string_name
    }

    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    /// Where this folder's new files live inside an extracted release.
    pub fn update_path(&self, release_root: &Path) -> PathBuf {
        release_root.join(APPLICATION_DIR).join(&self.name)
    }

    /// Path of the folder's main binary inside an extracted release.
    pub fn update_assembly_path(&self, release_root: &Path) -> PathBuf {
        let base = self.update_path(release_root);
        match self.kind {
            AppFolderKind::Web { .. } => base.join(WEB_BIN_DIR).join(&self.assembly_name),
            _ => base.join(&self.assembly_name),
        }
    }

    /// Configuration file for this folder when its files live in `dir`.
    pub fn config_path_in(&self, dir: &Path) -> PathBuf {
        match self.kind {
            AppFolderKind::Web { .. } => dir.join(WEB_CONFIG_FILENAME),
            _ => dir.join(format!("{}.config", self.assembly_name)),
        }
    }

    pub fn update_config_path(&self, release_root: &Path) -> PathBuf {
        self.config_path_in(&self.update_path(release_root))
    }
}
