// ABOUTME: SQL execution seam used by the migrator, with a SQLite implementation.
// ABOUTME: The SQLite executor keeps the SchemaChange ledger table.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::ExecutorError;
use crate::types::ScriptVersion;

/// One row of the SchemaChange ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaLedgerEntry {
    pub version: ScriptVersion,
    pub applied_at: DateTime<Utc>,
    pub script_name: String,
    pub notes: String,
}

/// Opens executors for a connection string.
#[async_trait]
pub trait SqlConnector: Send + Sync {
    async fn connect(&self, connection_string: &str) -> Result<Box<dyn SqlExecutor>, ExecutorError>;
}

/// An open database the migrator can drive.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Cheap round trip proving the database answers.
    async fn probe(&self) -> Result<(), ExecutorError>;

    /// Highest ledgered version.
    async fn installed_version(&self) -> Result<ScriptVersion, ExecutorError>;

    /// Run one batch inside its own transaction.
    async fn execute_batch(&self, sql: &str) -> Result<(), ExecutorError>;

    async fn record(&self, entry: &SchemaLedgerEntry) -> Result<(), ExecutorError>;

    /// Whether a bootstrap script already ran against this database.
    ///
    /// Bootstrap scripts stay out of the ledger, so they are tracked separately.
    async fn bootstrap_applied(&self, script_name: &str) -> Result<bool, ExecutorError>;

    async fn mark_bootstrap_applied(&self, script_name: &str) -> Result<(), ExecutorError>;
}

/// Connects to SQLite databases named by `sqlite:` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

#[async_trait]
impl SqlConnector for SqliteConnector {
    async fn connect(&self, connection_string: &str) -> Result<Box<dyn SqlExecutor>, ExecutorError> {
        Ok(Box::new(SqliteExecutor::connect(connection_string).await?))
    }
}

pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    pub async fn connect(connection_string: &str) -> Result<Self, ExecutorError> {
        let options = SqliteConnectOptions::from_str(connection_string)?;

        // A single long-lived connection keeps in-memory databases alive
        // between batches.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let executor = Self { pool };
        executor.init_ledger().await?;
        Ok(executor)
    }

    async fn init_ledger(&self) -> Result<(), ExecutorError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS SchemaChange (
                SchemaChangeId INTEGER PRIMARY KEY AUTOINCREMENT,
                DatabaseVersion REAL NOT NULL,
                ScriptName TEXT NOT NULL,
                DateApplied TEXT NOT NULL,
                Notes TEXT NOT NULL DEFAULT ''
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS SchemaBootstrap (
                ScriptName TEXT PRIMARY KEY,
                DateApplied TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Ledger rows in version order.
    pub async fn history(&self) -> Result<Vec<SchemaLedgerEntry>, ExecutorError> {
        let rows: Vec<(f64, String, DateTime<Utc>, String)> = sqlx::query_as(
            "SELECT DatabaseVersion, ScriptName, DateApplied, Notes FROM SchemaChange ORDER BY DatabaseVersion",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(version, script_name, applied_at, notes)| {
                let version = ScriptVersion::new(version)
                    .map_err(|e| ExecutorError::Rejected(e.to_string()))?;
                Ok(SchemaLedgerEntry {
                    version,
                    applied_at,
                    script_name,
                    notes,
                })
            })
            .collect()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn probe(&self) -> Result<(), ExecutorError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn installed_version(&self) -> Result<ScriptVersion, ExecutorError> {
        let max: Option<f64> = sqlx::query_scalar("SELECT MAX(DatabaseVersion) FROM SchemaChange")
            .fetch_one(&self.pool)
            .await?;
        match max {
            Some(value) => ScriptVersion::new(value).map_err(|e| ExecutorError::Rejected(e.to_string())),
            None => Ok(ScriptVersion::ZERO),
        }
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), ExecutorError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(sql).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn record(&self, entry: &SchemaLedgerEntry) -> Result<(), ExecutorError> {
        sqlx::query(
            "INSERT INTO SchemaChange (DatabaseVersion, ScriptName, DateApplied, Notes) VALUES (?, ?, ?, ?)",
        )
        .bind(entry.version.as_f64())
        .bind(&entry.script_name)
        .bind(entry.applied_at)
        .bind(&entry.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn bootstrap_applied(&self, script_name: &str) -> Result<bool, ExecutorError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM SchemaBootstrap WHERE ScriptName = ?")
                .bind(script_name)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn mark_bootstrap_applied(&self, script_name: &str) -> Result<(), ExecutorError> {
        sqlx::query("INSERT OR IGNORE INTO SchemaBootstrap (ScriptName, DateApplied) VALUES (?, ?)")
            .bind(script_name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
