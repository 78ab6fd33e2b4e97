// ABOUTME: Collaborators that touch the host: web server, OS services, and config files.
// ABOUTME: Traits used by the orchestrator plus utility-driven default implementations.

mod config_store;
mod error;
mod process;
mod service;
mod web;

pub use config_store::JsonConfigStore;
pub use error::HostError;
pub use process::HostUtility;
pub use service::ProcessServiceHost;
pub use web::ProcessWebHost;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A web site that hosts applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
}

impl Site {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// An application mounted in a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebApplication {
    pub name: String,
    pub physical_path: PathBuf,
    #[serde(default)]
    pub pool: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Running,
    Stopped,
    /// Starting, stopping, paused, or anything else in between.
    Pending,
}

impl ServiceStatus {
    /// Parse a status word as reported by service utilities.
    pub fn from_report(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "running" => ServiceStatus::Running,
            "stopped" => ServiceStatus::Stopped,
            _ => ServiceStatus::Pending,
        }
    }
}

/// A registered OS service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHandle {
    pub name: String,
    pub status: ServiceStatus,
    /// Binary the registration points at, when the host reports it.
    #[serde(default)]
    pub binary_path: Option<PathBuf>,
}

/// The settings of one configuration file that deployments care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub app_settings: BTreeMap<String, String>,
    /// Value of the folder's named connection string.
    pub connection_string: Option<String>,
}

#[async_trait]
pub trait WebHostManager: Send + Sync {
    /// Site hosting `application`, or the default site when it is not installed.
    async fn find_by_application_name(&self, application: &str) -> Result<Option<Site>, HostError>;

    async fn application(
        &self,
        site: &Site,
        application: &str,
    ) -> Result<Option<WebApplication>, HostError>;

    async fn application_exists(&self, application: &str) -> Result<bool, HostError>;

    /// Create the pool, or reset its settings if it exists.
    async fn create_pool(&self, pool: &str) -> Result<(), HostError>;

    /// Point the application at `path`, creating the application if needed.
    async fn set_application_path(
        &self,
        site: &Site,
        application: &str,
        path: &Path,
    ) -> Result<(), HostError>;

    async fn set_application_pool(
        &self,
        site: &Site,
        application: &str,
        pool: &str,
    ) -> Result<(), HostError>;
}

#[async_trait]
pub trait ServiceHostManager: Send + Sync {
    async fn find(&self, name: &str) -> Result<Option<ServiceHandle>, HostError>;

    async fn stop(&self, name: &str) -> Result<(), HostError>;

    async fn start(&self, name: &str) -> Result<(), HostError>;

    /// Register the service whose binary is at `binary_path`.
    async fn install(&self, binary_path: &Path) -> Result<(), HostError>;

    async fn uninstall(&self, binary_path: &Path) -> Result<(), HostError>;
}

/// Reads and writes component configuration files.
pub trait ConfigStore: Send + Sync {
    fn read(&self, path: &Path, connection_name: &str) -> Result<AppConfig, HostError>;

    /// Store `config` in the file, keeping entries it does not mention.
    fn write(&self, path: &Path, connection_name: &str, config: &AppConfig)
    -> Result<(), HostError>;
}
