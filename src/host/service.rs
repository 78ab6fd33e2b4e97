// ABOUTME: ServiceHostManager driven by a configured service utility.
// ABOUTME: Maps each operation to a utility subcommand.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use super::{HostError, HostUtility, ServiceHandle, ServiceHostManager, ServiceStatus};

/// Service manager that shells out to a utility.
///
/// Subcommands:
/// - `query <name>` prints `{"name", "status", "binary_path"}` as JSON, or
///   nothing when the service is not registered
/// - `start <name>`, `stop <name>`
/// - `install <binary>`, `uninstall <binary>`
#[derive(Debug, Clone)]
pub struct ProcessServiceHost {
    utility: HostUtility,
}

#[derive(Deserialize)]
struct QueryReport {
    name: String,
    status: String,
    #[serde(default)]
    binary_path: Option<PathBuf>,
}

impl ProcessServiceHost {
    pub fn new(utility: HostUtility) -> Self {
        Self { utility }
    }
}

#[async_trait]
impl ServiceHostManager for ProcessServiceHost {
    async fn find(&self, name: &str) -> Result<Option<ServiceHandle>, HostError> {
        let stdout = self.utility.run(["query", name]).await?;
        if stdout.is_empty() {
            return Ok(None);
        }
        let report: QueryReport =
            serde_json::from_str(&stdout).map_err(|e| HostError::BadOutput {
                program: self.utility.program.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(ServiceHandle {
            name: report.name,
            status: ServiceStatus::from_report(&report.status),
            binary_path: report.binary_path,
        }))
    }

    async fn stop(&self, name: &str) -> Result<(), HostError> {
        self.utility.run(["stop", name]).await.map(drop)
    }

    async fn start(&self, name: &str) -> Result<(), HostError> {
        self.utility.run(["start", name]).await.map(drop)
    }

    async fn install(&self, binary_path: &Path) -> Result<(), HostError> {
        let output = self
            .utility
            .run([Path::new("install").as_os_str(), binary_path.as_os_str()])
            .await?;
        tracing::debug!(output = %output, "service installed");
        Ok(())
    }

    async fn uninstall(&self, binary_path: &Path) -> Result<(), HostError> {
        self.utility
            .run([Path::new("uninstall").as_os_str(), binary_path.as_os_str()])
            .await
            .map(drop)
    }
}
