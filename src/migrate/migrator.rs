// ABOUTME: Schema migrator: bootstraps new databases and applies pending scripts in order.
// ABOUTME: Fires conversion hooks around scripts and records successes in the ledger.

use std::sync::Arc;

use chrono::Utc;

use super::{
    MigrateError, MigrationScript, SchemaLedgerEntry, ScriptRegistry, ScriptStatus,
    SqlConnector, SqlExecutor, BASELINE_SCRIPT, SEED_SCRIPT,
};
use crate::hooks::{ConversionContext, ConversionPhase, ConversionRegistry};
use crate::outcome::{FailureKind, Outcome};
use crate::types::ScriptVersion;

pub const MISSING_CONNECTION_STRING: &str = "Database connection string missing.";
pub const CONNECTION_FAILED: &str = "Connection to the database failed.";

/// What happened to one script during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRun {
    pub name: String,
    pub version: ScriptVersion,
    pub status: ScriptStatus,
    /// `--$` comment of the batch that failed.
    pub comment: Option<String>,
    pub error: Option<String>,
}

/// Detailed result of a migration run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub outcome: Outcome,
    /// Scripts attempted, in execution order.
    pub runs: Vec<ScriptRun>,
    pub installed_before: Option<ScriptVersion>,
    pub installed_after: Option<ScriptVersion>,
}

impl MigrationReport {
    fn rejected(outcome: Outcome) -> Self {
        Self {
            outcome,
            runs: Vec::new(),
            installed_before: None,
            installed_after: None,
        }
    }

    /// Names of scripts that ran, bootstrap scripts included.
    pub fn executed(&self) -> Vec<&str> {
        self.runs.iter().map(|r| r.name.as_str()).collect()
    }
}

pub struct SchemaMigrator {
    scripts: Arc<ScriptRegistry>,
    conversions: Arc<ConversionRegistry>,
    connector: Arc<dyn SqlConnector>,
}

impl SchemaMigrator {
    pub fn new(
        scripts: Arc<ScriptRegistry>,
        conversions: Arc<ConversionRegistry>,
        connector: Arc<dyn SqlConnector>,
    ) -> Self {
        Self {
            scripts,
            conversions,
            connector,
        }
    }

    pub fn scripts(&self) -> &ScriptRegistry {
        &self.scripts
    }

    /// Bring the database up to the newest script version.
    pub async fn run(&self, connection_string: &str) -> Result<Outcome, MigrateError> {
        Ok(self.run_with_report(connection_string).await?.outcome)
    }

    /// Like [`run`](Self::run), also reporting every script attempted.
    ///
    /// Hook failures are returned as `Err`; every other failure is a failed
    /// outcome inside the report.
    pub async fn run_with_report(
        &self,
        connection_string: &str,
    ) -> Result<MigrationReport, MigrateError> {
        let db = match self.preflight(connection_string).await {
            Ok(db) => db,
            Err(outcome) => return Ok(MigrationReport::rejected(outcome)),
        };

        let mut runs = Vec::new();
        let before = installed_version(db.as_ref()).await;
        let target = self.scripts.max_version();
        tracing::info!(installed = %before, target = %target, "database versions");

        if needs_bootstrap(db.as_ref(), before).await {
            tracing::info!("database is new, creating baseline schema");
            if let Some(outcome) = self
                .bootstrap(db.as_ref(), connection_string, &mut runs)
                .await?
            {
                return Ok(report(outcome, runs, before, db.as_ref()).await);
            }
        }

        let installed = installed_version(db.as_ref()).await;
        if installed >= target {
            tracing::info!(version = %installed, "database is current");
            let outcome = Outcome::success(format!("Database is current at version {installed}."));
            return Ok(report(outcome, runs, before, db.as_ref()).await);
        }

        let pending: Vec<&MigrationScript> = self.scripts.pending(installed).collect();
        for script in &pending {
            tracing::info!(script = script.name(), "scheduled");
        }

        for script in pending {
            let run = self
                .run_script(db.as_ref(), script, connection_string, true)
                .await?;
            let failed = run.status == ScriptStatus::Failed;
            let message = run.error.clone().unwrap_or_default();
            runs.push(run);
            if failed {
                let outcome = Outcome::failure(
                    FailureKind::Migration,
                    format!(
                        "The script {} failed: {message}. The update has stopped; fix the errors and run it again.",
                        script.name()
                    ),
                );
                return Ok(report(outcome, runs, before, db.as_ref()).await);
            }
        }

        let outcome = Outcome::success(format!("Database updated to version {target}."));
        Ok(report(outcome, runs, before, db.as_ref()).await)
    }

    /// True when the database is bootstrapped and the ledger already holds the
    /// newest script version.
    pub async fn is_current(&self, connection_string: &str) -> Result<bool, Outcome> {
        let db = self.preflight(connection_string).await?;
        let installed = installed_version(db.as_ref()).await;
        if needs_bootstrap(db.as_ref(), installed).await {
            return Ok(false);
        }
        Ok(installed >= self.scripts.max_version())
    }

    async fn preflight(&self, connection_string: &str) -> Result<Box<dyn SqlExecutor>, Outcome> {
        if connection_string.trim().is_empty() {
            return Err(Outcome::failure(
                FailureKind::Validation,
                MISSING_CONNECTION_STRING,
            ));
        }

        let db = match self.connector.connect(connection_string).await {
            Ok(db) => db,
            Err(e) => {
                tracing::error!(error = %e, "could not open database");
                return Err(Outcome::failure(FailureKind::Connectivity, CONNECTION_FAILED));
            }
        };

        if let Err(e) = db.probe().await {
            tracing::error!(error = %e, "database did not answer");
            return Err(Outcome::failure(FailureKind::Connectivity, CONNECTION_FAILED));
        }

        tracing::debug!("connection string looks good");
        Ok(db)
    }

    async fn bootstrap(
        &self,
        db: &dyn SqlExecutor,
        connection_string: &str,
        runs: &mut Vec<ScriptRun>,
    ) -> Result<Option<Outcome>, MigrateError> {
        let steps = [
            (self.scripts.baseline(), BASELINE_SCRIPT, false, "initial schema"),
            (self.scripts.seed(), SEED_SCRIPT, true, "initial defaults"),
        ];

        for (script, file, hooks, what) in steps {
            if bootstrap_applied(db, file).await {
                tracing::debug!(script = file, "{what} already created, skipping");
                continue;
            }

            let Some(script) = script else {
                return Ok(Some(Outcome::failure(
                    FailureKind::Migration,
                    format!("Creating the {what} failed: {file} could not be found."),
                )));
            };

            let run = self
                .run_script(db, script, connection_string, hooks)
                .await?;
            let failed = run.status == ScriptStatus::Failed;
            let message = run.error.clone().unwrap_or_default();
            runs.push(run);
            if failed {
                return Ok(Some(Outcome::failure(
                    FailureKind::Migration,
                    format!("Creating the {what} failed while running {file}: {message}"),
                )));
            }
            if let Err(e) = db.mark_bootstrap_applied(file).await {
                tracing::error!(script = file, error = %e, "could not record bootstrap step");
                return Ok(Some(Outcome::failure(
                    FailureKind::Migration,
                    format!("Creating the {what} failed: could not record {file}: {e}"),
                )));
            }
            tracing::info!(script = file, "{what} created");
        }

        Ok(None)
    }

    async fn run_script(
        &self,
        db: &dyn SqlExecutor,
        script: &MigrationScript,
        connection_string: &str,
        hooks: bool,
    ) -> Result<ScriptRun, MigrateError> {
        let context = ConversionContext {
            script_name: script.name().to_string(),
            version: script.version(),
            connection_string: connection_string.to_string(),
        };

        if hooks {
            self.conversions.run(ConversionPhase::Before, &context).await?;
        }

        tracing::info!(script = script.name(), batches = script.batches().len(), "running script");
        let mut run = ScriptRun {
            name: script.name().to_string(),
            version: script.version(),
            status: ScriptStatus::NotRun,
            comment: None,
            error: None,
        };

        for batch in script.batches() {
            if let Err(e) = db.execute_batch(&batch.sql).await {
                tracing::error!(script = script.name(), comment = ?batch.comment, error = %e, "batch failed");
                run.status = ScriptStatus::Failed;
                run.comment = batch.comment.clone();
                run.error = Some(match &batch.comment {
                    Some(comment) => format!("batch '{comment}' failed: {e}"),
                    None => e.to_string(),
                });
                return Ok(run);
            }
        }

        if script.is_loggable() {
            let entry = SchemaLedgerEntry {
                version: script.version(),
                applied_at: Utc::now(),
                script_name: script.name().to_string(),
                notes: script.notes().join("\n"),
            };
            if let Err(e) = db.record(&entry).await {
                tracing::error!(script = script.name(), error = %e, "could not record ledger entry");
                run.status = ScriptStatus::Failed;
                run.error = Some(format!("ledger update failed: {e}"));
                return Ok(run);
            }
        }

        run.status = ScriptStatus::Success;
        tracing::info!(script = script.name(), "script succeeded");

        if hooks {
            self.conversions.run(ConversionPhase::After, &context).await?;
        }

        Ok(run)
    }
}

/// Installed version, or zero when the ledger cannot be read.
async fn installed_version(db: &dyn SqlExecutor) -> ScriptVersion {
    match db.installed_version().await {
        Ok(version) => version,
        Err(e) => {
            tracing::debug!(error = %e, "ledger unreadable, treating database as new");
            ScriptVersion::ZERO
        }
    }
}

/// A database needs bootstrapping until both bootstrap scripts are recorded.
///
/// Databases with ledger rows predate the bootstrap record and count as
/// bootstrapped.
async fn needs_bootstrap(db: &dyn SqlExecutor, installed: ScriptVersion) -> bool {
    if !installed.is_zero() {
        return false;
    }
    !(bootstrap_applied(db, BASELINE_SCRIPT).await && bootstrap_applied(db, SEED_SCRIPT).await)
}

async fn bootstrap_applied(db: &dyn SqlExecutor, script: &str) -> bool {
    match db.bootstrap_applied(script).await {
        Ok(applied) => applied,
        Err(e) => {
            tracing::debug!(script, error = %e, "bootstrap record unreadable");
            false
        }
    }
}

async fn report(
    outcome: Outcome,
    runs: Vec<ScriptRun>,
    before: ScriptVersion,
    db: &dyn SqlExecutor,
) -> MigrationReport {
    MigrationReport {
        outcome,
        runs,
        installed_before: Some(before),
        installed_after: Some(installed_version(db).await),
    }
}
