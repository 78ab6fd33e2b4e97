// ABOUTME: Ordered collection of migration scripts.
// ABOUTME: Loads scripts from embedded pairs or a directory and rejects ambiguous versions.

use std::path::Path;

use crate::types::ScriptVersion;

use super::{BASELINE_SCRIPT, MigrateError, MigrationScript, SEED_SCRIPT};

/// Migration scripts sorted by ascending version.
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    scripts: Vec<MigrationScript>,
}

impl ScriptRegistry {
    /// Build a registry, rejecting duplicate names and duplicate non-zero versions.
    pub fn new(mut scripts: Vec<MigrationScript>) -> Result<Self, MigrateError> {
        scripts.sort_by(|a, b| {
            a.version()
                .cmp(&b.version())
                .then_with(|| a.name().cmp(b.name()))
        });

        for pair in scripts.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            if !first.version().is_zero() && first.version() == second.version() {
                return Err(MigrateError::DuplicateVersion {
                    version: first.version(),
                    first: first.name().to_string(),
                    second: second.name().to_string(),
                });
            }
        }

        for (i, script) in scripts.iter().enumerate() {
            if scripts[..i].iter().any(|earlier| earlier.is_named(script.name())) {
                return Err(MigrateError::DuplicateScript(script.name().to_string()));
            }
        }

        Ok(Self { scripts })
    }

    /// Scripts compiled into the binary, as `(file name, contents)` pairs.
    pub fn from_embedded(scripts: &[(&str, &str)]) -> Result<Self, MigrateError> {
        let parsed = scripts
            .iter()
            .map(|(name, contents)| MigrationScript::parse(*name, contents))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }

    /// Every `.sql` file directly inside `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, MigrateError> {
        let read_err = |source: std::io::Error| MigrateError::ReadScripts {
            path: dir.to_path_buf(),
            source,
        };

        let mut scripts = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            let is_sql = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
            if !is_sql || !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!(path = %path.display(), "skipping script with non UTF-8 name");
                continue;
            };
            let contents = std::fs::read_to_string(&path).map_err(|source| {
                MigrateError::ReadScripts {
                    path: path.clone(),
                    source,
                }
            })?;
            scripts.push(MigrationScript::parse(name, &contents)?);
        }

        tracing::debug!(dir = %dir.display(), count = scripts.len(), "loaded migration scripts");
        Self::new(scripts)
    }

    /// Look a script up by file name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&MigrationScript> {
        self.scripts.iter().find(|s| s.is_named(name))
    }

    pub fn baseline(&self) -> Option<&MigrationScript> {
        self.get(BASELINE_SCRIPT)
    }

    pub fn seed(&self) -> Option<&MigrationScript> {
        self.get(SEED_SCRIPT)
    }

    /// Highest version in the registry, zero when it holds no numbered scripts.
    pub fn max_version(&self) -> ScriptVersion {
        self.scripts
            .last()
            .map(MigrationScript::version)
            .unwrap_or(ScriptVersion::ZERO)
    }

    /// Scripts newer than `installed`, in execution order.
    pub fn pending(&self, installed: ScriptVersion) -> impl Iterator<Item = &MigrationScript> {
        self.scripts.iter().filter(move |s| s.version() > installed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MigrationScript> {
        self.scripts.iter()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
