// ABOUTME: A single migration script: version parsed from its name, SQL split into batches.
// ABOUTME: Also extracts `--@` notes and `--$` batch comments.

use crate::types::ScriptVersion;

use super::MigrateError;

/// Creates the schema of a brand new database.
pub const BASELINE_SCRIPT: &str = "databasebaseline.sql";

/// Loads default data into a brand new database, right after the baseline.
pub const SEED_SCRIPT: &str = "databasedefaults.sql";

/// Lines containing this marker carry notes stored in the ledger.
pub const NOTE_PREFIX: &str = "--@";

/// Lines containing this marker describe the batch they appear in.
pub const COMMENT_PREFIX: &str = "--$";

const DISABLED_PREFIX: &str = "REM";
const BATCH_SEPARATOR: &str = "GO";

/// Result state of running a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    NotRun,
    Success,
    Failed,
}

/// One transaction's worth of SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub sql: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MigrationScript {
    name: String,
    version: ScriptVersion,
    batches: Vec<Batch>,
    notes: Vec<String>,
    loggable: bool,
}

impl MigrationScript {
    /// Build a script from its file name and contents.
    pub fn parse(name: impl Into<String>, contents: &str) -> Result<Self, MigrateError> {
        let name = name.into();
        let version = version_from_name(&name)?;
        Ok(Self::with_version(name, version, contents))
    }

    pub fn with_version(name: impl Into<String>, version: ScriptVersion, contents: &str) -> Self {
        let name = name.into();
        // baseline and seed scripts never produce ledger rows
        let loggable =
            !name.eq_ignore_ascii_case(BASELINE_SCRIPT) && !name.eq_ignore_ascii_case(SEED_SCRIPT);
        Self {
            batches: split_batches(contents),
            notes: extract_marked(contents, NOTE_PREFIX),
            name,
            version,
            loggable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> ScriptVersion {
        self.version
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Whether a successful run is recorded in the ledger.
    pub fn is_loggable(&self) -> bool {
        self.loggable
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Version encoded in a script file name.
///
/// `2.5-add-index.sql` is version 2.5. Names without a `-` and names starting
/// with `REM` are version 0, which never runs incrementally.
pub fn version_from_name(name: &str) -> Result<ScriptVersion, MigrateError> {
    if name.starts_with(DISABLED_PREFIX) {
        return Ok(ScriptVersion::ZERO);
    }
    let Some((prefix, _)) = name.split_once('-') else {
        return Ok(ScriptVersion::ZERO);
    };
    ScriptVersion::parse(prefix).map_err(|source| MigrateError::InvalidScriptVersion {
        script: name.to_string(),
        source,
    })
}

/// Split SQL on lines holding only `GO`.
///
/// Blank batches and batches that open with a block comment are dropped.
pub fn split_batches(sql: &str) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        if line.trim().eq_ignore_ascii_case(BATCH_SEPARATOR) {
            push_batch(&mut batches, std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_batch(&mut batches, current);

    batches
}

fn push_batch(batches: &mut Vec<Batch>, sql: String) {
    let trimmed = sql.trim();
    if trimmed.is_empty() || trimmed.starts_with("/*") {
        return;
    }
    let comment = extract_marked(&sql, COMMENT_PREFIX);
    batches.push(Batch {
        comment: (!comment.is_empty()).then(|| comment.join("\n")),
        sql,
    });
}

fn extract_marked(text: &str, marker: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.find(marker).map(|at| line[at + marker.len()..].trim().to_string()))
        .collect()
}
