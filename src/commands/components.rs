// ABOUTME: Builds the migrator, orchestrator, and driver from configuration.
// ABOUTME: Host managers are the process-backed implementations.

use std::path::Path;
use std::sync::Arc;

use dropship::config::Config;
use dropship::deploy::{DeploymentDriver, DeploymentOrchestrator};
use dropship::error::Result;
use dropship::hooks::ConversionRegistry;
use dropship::host::{JsonConfigStore, ProcessServiceHost, ProcessWebHost};
use dropship::migrate::{SchemaMigrator, ScriptRegistry, SqliteConnector};

pub fn scripts(dir: &Path) -> Result<ScriptRegistry> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "no migration scripts directory");
        return Ok(ScriptRegistry::new(Vec::new())?);
    }
    Ok(ScriptRegistry::from_dir(dir)?)
}

pub fn migrator(conversions: ConversionRegistry, scripts_dir: &Path) -> Result<SchemaMigrator> {
    Ok(SchemaMigrator::new(
        Arc::new(scripts(scripts_dir)?),
        Arc::new(conversions),
        Arc::new(SqliteConnector),
    ))
}

pub fn orchestrator(config: &Config) -> DeploymentOrchestrator {
    DeploymentOrchestrator::new(
        Arc::new(ProcessWebHost::new(config.hosts.web_util.clone())),
        Arc::new(ProcessServiceHost::new(config.hosts.service_util.clone())),
        Arc::new(JsonConfigStore::new()),
    )
}

/// Driver for a release rooted at `release_root`.
pub fn driver(config: &Config, release_root: &Path) -> Result<DeploymentDriver> {
    let migrator = migrator(config.conversions(), &config.scripts_dir(release_root))?;
    Ok(DeploymentDriver::new(orchestrator(config), migrator))
}
