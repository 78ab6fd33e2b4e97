// ABOUTME: Deployment drivers: full release, single folder, and database only.
// ABOUTME: Runs the schema migrator before folders and halts at the first failure.

use super::{DeployError, DeploymentOrchestrator, Release};
use crate::migrate::SchemaMigrator;
use crate::outcome::{FailureKind, Outcome};

pub struct DeploymentDriver {
    orchestrator: DeploymentOrchestrator,
    migrator: SchemaMigrator,
}

impl DeploymentDriver {
    pub fn new(orchestrator: DeploymentOrchestrator, migrator: SchemaMigrator) -> Self {
        Self {
            orchestrator,
            migrator,
        }
    }

    pub fn orchestrator(&self) -> &DeploymentOrchestrator {
        &self.orchestrator
    }

    /// Migrate the database, then deploy every folder in manifest order.
    ///
    /// The connection string comes from the installed copies of the release's
    /// web folders first, then its service folders.
    pub async fn full(&self, release: &Release) -> Result<Outcome, DeployError> {
        tracing::info!(release = %release.label(), root = %release.root().display(), "starting full deployment");

        let connection_string = self
            .orchestrator
            .resolve_connection_string(release)
            .await
            .unwrap_or_default();
        if connection_string.is_empty() {
            tracing::warn!("no installed web application or service provides a connection string");
        }

        let database = self.migrator.run(&connection_string).await?;
        if !database.success {
            return Ok(database);
        }

        let mut warnings = database.warnings;
        let mut deployed = 0usize;
        for folder in release.manifest().folders() {
            let mut outcome = self
                .orchestrator
                .deploy(release, folder, Some(&connection_string))
                .await?;
            if !outcome.success {
                tracing::error!(folder = %folder.name(), "deployment halted");
                warnings.append(&mut outcome.warnings);
                outcome.warnings = warnings;
                return Ok(outcome);
            }
            warnings.append(&mut outcome.warnings);
            deployed += 1;
        }

        let mut outcome = Outcome::success(format!(
            "{} deployed: database current, {deployed} folder(s) updated.",
            release.label()
        ));
        outcome.warnings = warnings;
        tracing::info!(release = %release.label(), "full deployment finished");
        Ok(outcome)
    }

    /// Deploy one named folder with an explicit connection string.
    pub async fn single_folder(
        &self,
        release: &Release,
        folder_name: &str,
        connection_string: &str,
    ) -> Result<Outcome, DeployError> {
        let Some(folder) = release.manifest().folder(folder_name) else {
            return Ok(Outcome::failure(
                FailureKind::Validation,
                format!("The release has no folder named {folder_name}."),
            ));
        };
        self.orchestrator
            .deploy(release, folder, Some(connection_string))
            .await
    }

    /// Run only the schema migrator.
    pub async fn database_only(&self, connection_string: &str) -> Result<Outcome, DeployError> {
        Ok(self.migrator.run(connection_string).await?)
    }
}
