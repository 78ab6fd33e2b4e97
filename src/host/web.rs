// ABOUTME: WebHostManager driven by a configured web server utility.
// ABOUTME: Maps each operation to a utility subcommand.

use std::ffi::OsStr;
use std::path::Path;

use async_trait::async_trait;

use super::{HostError, HostUtility, Site, WebApplication, WebHostManager};

/// Web server manager that shells out to a utility.
///
/// Subcommands:
/// - `site-for <app>` prints the hosting site name (or the default site), or nothing
/// - `app <site> <app>` prints `{"name", "physical_path", "pool"}` as JSON, or nothing
/// - `app-exists <app>` prints `true` or `false`
/// - `create-pool <pool>`
/// - `set-path <site> <app> <path>`
/// - `set-pool <site> <app> <pool>`
#[derive(Debug, Clone)]
pub struct ProcessWebHost {
    utility: HostUtility,
}

impl ProcessWebHost {
    pub fn new(utility: HostUtility) -> Self {
        Self { utility }
    }

    fn bad_output(&self, reason: impl Into<String>) -> HostError {
        HostError::BadOutput {
            program: self.utility.program.display().to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl WebHostManager for ProcessWebHost {
    async fn find_by_application_name(&self, application: &str) -> Result<Option<Site>, HostError> {
        let stdout = self.utility.run(["site-for", application]).await?;
        Ok((!stdout.is_empty()).then(|| Site::new(stdout)))
    }

    async fn application(
        &self,
        site: &Site,
        application: &str,
    ) -> Result<Option<WebApplication>, HostError> {
        let stdout = self.utility.run(["app", site.name.as_str(), application]).await?;
        if stdout.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&stdout)
            .map(Some)
            .map_err(|e| self.bad_output(e.to_string()))
    }

    async fn application_exists(&self, application: &str) -> Result<bool, HostError> {
        let stdout = self.utility.run(["app-exists", application]).await?;
        match stdout.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(self.bad_output(format!("expected true or false, got '{other}'"))),
        }
    }

    async fn create_pool(&self, pool: &str) -> Result<(), HostError> {
        self.utility.run(["create-pool", pool]).await.map(drop)
    }

    async fn set_application_path(
        &self,
        site: &Site,
        application: &str,
        path: &Path,
    ) -> Result<(), HostError> {
        let args: [&OsStr; 4] = [
            "set-path".as_ref(),
            site.name.as_ref(),
            application.as_ref(),
            path.as_os_str(),
        ];
        self.utility.run(args).await.map(drop)
    }

    async fn set_application_pool(
        &self,
        site: &Site,
        application: &str,
        pool: &str,
    ) -> Result<(), HostError> {
        self.utility
            .run(["set-pool", site.name.as_str(), application, pool])
            .await
            .map(drop)
    }
}
