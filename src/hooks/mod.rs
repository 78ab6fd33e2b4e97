// ABOUTME: Conversion hooks that run around versioned migration scripts.
// ABOUTME: Routines register for a script version and phase; commands can serve as routines.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

use crate::types::ScriptVersion;

/// When a conversion runs relative to its script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionPhase {
    /// Before the script's first batch executes.
    Before,
    /// After the script succeeded and its ledger row was written.
    After,
}

impl ConversionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionPhase::Before => "before",
            ConversionPhase::After => "after",
        }
    }
}

/// What a conversion routine is told about the script it accompanies.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    pub script_name: String,
    pub version: ScriptVersion,
    pub connection_string: String,
}

impl ConversionContext {
    /// Environment passed to command conversions.
    pub fn to_env(&self, phase: ConversionPhase) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("DROPSHIP_SCRIPT".to_string(), self.script_name.clone());
        env.insert("DROPSHIP_SCRIPT_VERSION".to_string(), self.version.to_string());
        env.insert("DROPSHIP_PHASE".to_string(), phase.as_str().to_string());
        env.insert(
            "DROPSHIP_CONNECTION_STRING".to_string(),
            self.connection_string.clone(),
        );
        env
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("conversion '{routine}' failed: {message}")]
    Failed { routine: String, message: String },

    #[error("conversion '{routine}' could not be started: {source}")]
    Spawn {
        routine: String,
        #[source]
        source: std::io::Error,
    },
}

/// Data-conversion work tied to one schema version.
#[async_trait]
pub trait ConversionRoutine: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, context: &ConversionContext) -> Result<(), HookError>;
}

struct Registration {
    version: ScriptVersion,
    phase: ConversionPhase,
    routine: Arc<dyn ConversionRoutine>,
}

/// Conversion routines keyed by (version, phase), kept in registration order.
#[derive(Default)]
pub struct ConversionRegistry {
    registrations: Vec<Registration>,
}

impl ConversionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        version: ScriptVersion,
        phase: ConversionPhase,
        routine: Arc<dyn ConversionRoutine>,
    ) -> &mut Self {
        self.registrations.push(Registration {
            version,
            phase,
            routine,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Routines registered for exactly this version and phase.
    pub fn matching(
        &self,
        version: ScriptVersion,
        phase: ConversionPhase,
    ) -> impl Iterator<Item = &Arc<dyn ConversionRoutine>> {
        self.registrations
            .iter()
            .filter(move |r| r.version == version && r.phase == phase)
            .map(|r| &r.routine)
    }

    /// Run every matching routine in registration order, stopping at the first error.
    ///
    /// Returns how many routines ran.
    pub async fn run(
        &self,
        phase: ConversionPhase,
        context: &ConversionContext,
    ) -> Result<usize, HookError> {
        let mut ran = 0;
        for routine in self.matching(context.version, phase) {
            tracing::info!(
                routine = routine.name(),
                script = %context.script_name,
                phase = phase.as_str(),
                "running conversion"
            );
            routine.run(context).await?;
            ran += 1;
        }
        Ok(ran)
    }
}

/// A conversion carried out by an external program.
///
/// The program gets the script name, version, phase, and connection string in
/// `DROPSHIP_*` environment variables. A non-zero exit fails the conversion.
#[derive(Debug, Clone)]
pub struct CommandConversion {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    phase: ConversionPhase,
}

impl CommandConversion {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<PathBuf>,
        args: Vec<String>,
        phase: ConversionPhase,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            phase,
        }
    }
}

#[async_trait]
impl ConversionRoutine for CommandConversion {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, context: &ConversionContext) -> Result<(), HookError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .envs(context.to_env(self.phase))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| HookError::Spawn {
                routine: self.name.clone(),
                source,
            })?;

        if output.status.success() {
            tracing::debug!(routine = %self.name, "conversion command succeeded");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(HookError::Failed {
            routine: self.name.clone(),
            message: match output.status.code() {
                Some(code) if stderr.is_empty() => format!("exit code {code}"),
                Some(code) => format!("exit code {code}: {stderr}"),
                None => "terminated by signal".to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl ConversionRoutine for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, context: &ConversionContext) -> Result<(), HookError> {
            self.log
                .lock()
                .push(format!("{}@{}", self.name, context.version));
            if self.fail {
                return Err(HookError::Failed {
                    routine: self.name.to_string(),
                    message: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    fn context(version: f64) -> ConversionContext {
        ConversionContext {
            script_name: format!("{version}-script.sql"),
            version: ScriptVersion::new(version).unwrap(),
            connection_string: "sqlite::memory:".to_string(),
        }
    }

    fn recorder(
        name: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
        fail: bool,
    ) -> Arc<dyn ConversionRoutine> {
        Arc::new(Recorder {
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    #[tokio::test]
    async fn runs_only_matching_version_and_phase() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ConversionRegistry::new();
        let v2 = ScriptVersion::new(2.0).unwrap();
        registry
            .register(v2, ConversionPhase::Before, recorder("a", &log, false))
            .register(v2, ConversionPhase::After, recorder("b", &log, false))
            .register(ScriptVersion::new(3.0).unwrap(), ConversionPhase::Before, recorder("c", &log, false))
            .register(v2, ConversionPhase::Before, recorder("d", &log, false));

        let ran = registry.run(ConversionPhase::Before, &context(2.0)).await.unwrap();

        assert_eq!(ran, 2);
        assert_eq!(*log.lock(), vec!["a@2", "d@2"]);
    }

    #[tokio::test]
    async fn first_failure_stops_remaining_routines() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ConversionRegistry::new();
        let v = ScriptVersion::new(1.5).unwrap();
        registry
            .register(v, ConversionPhase::After, recorder("bad", &log, true))
            .register(v, ConversionPhase::After, recorder("never", &log, false));

        let err = registry.run(ConversionPhase::After, &context(1.5)).await.unwrap_err();

        assert!(matches!(err, HookError::Failed { ref routine, .. } if routine == "bad"));
        assert_eq!(*log.lock(), vec!["bad@1.5"]);
    }

    #[test]
    fn context_env_carries_script_details() {
        let env = context(4.0).to_env(ConversionPhase::After);
        assert_eq!(env.get("DROPSHIP_SCRIPT_VERSION"), Some(&"4".to_string()));
        assert_eq!(env.get("DROPSHIP_PHASE"), Some(&"after".to_string()));
        assert_eq!(
            env.get("DROPSHIP_CONNECTION_STRING"),
            Some(&"sqlite::memory:".to_string())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_conversion_maps_exit_status() {
        let ok = CommandConversion::new("true", "true", vec![], ConversionPhase::Before);
        assert!(ok.run(&context(1.0)).await.is_ok());

        let failing = CommandConversion::new(
            "fails",
            "sh",
            vec!["-c".to_string(), "echo nope >&2; exit 3".to_string()],
            ConversionPhase::Before,
        );
        let err = failing.run(&context(1.0)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "conversion 'fails' failed: exit code 3: nope"
        );

        let missing = CommandConversion::new(
            "missing",
            "/nonexistent/dropship-conversion",
            vec![],
            ConversionPhase::Before,
        );
        assert!(matches!(
            missing.run(&context(1.0)).await,
            Err(HookError::Spawn { .. })
        ));
    }
}
