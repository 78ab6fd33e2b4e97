// ABOUTME: Versioned, hookable schema migration.
// ABOUTME: Script discovery, ordering, SQL execution, and the SchemaChange ledger.

mod error;
mod executor;
mod migrator;
mod registry;
mod script;

pub use error::{ExecutorError, MigrateError};
pub use executor::{SchemaLedgerEntry, SqlConnector, SqlExecutor, SqliteConnector, SqliteExecutor};
pub use migrator::{
    CONNECTION_FAILED, MISSING_CONNECTION_STRING, MigrationReport, SchemaMigrator, ScriptRun,
};
pub use registry::ScriptRegistry;
pub use script::{
    BASELINE_SCRIPT, Batch, COMMENT_PREFIX, MigrationScript, NOTE_PREFIX, SEED_SCRIPT, ScriptStatus,
    split_batches, version_from_name,
};
