// ABOUTME: Runs an external host utility and captures its output.
// ABOUTME: Waits without a timeout; a non-zero exit becomes a process failure.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::HostError;

/// A configured utility program plus arguments prepended to every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostUtility {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl HostUtility {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn display_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Run with extra arguments and return trimmed stdout.
    pub async fn run<I, S>(&self, args: I) -> Result<String, HostError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        tracing::debug!(command = ?command.as_std(), "running host utility");

        let output = command.output().await.map_err(|source| HostError::Spawn {
            program: self.display_name(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(HostError::CommandFailed {
            program: self.display_name(),
            code: output.status.code(),
            output: if stderr.is_empty() { stdout } else { stderr },
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::outcome::FailureKind;

    fn sh(script: &str) -> HostUtility {
        HostUtility::new("sh", vec!["-c".to_string(), script.to_string(), "util".to_string()])
    }

    #[tokio::test]
    async fn returns_trimmed_stdout() {
        let out = sh("echo \"got $1\"").run(["start"]).await.unwrap();
        assert_eq!(out, "got start");
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_process_failure() {
        let err = sh("echo denied >&2; exit 5").run(["stop", "svc"]).await.unwrap_err();
        assert!(matches!(err, HostError::CommandFailed { code: Some(5), ref output, .. } if output == "denied"));
        assert_eq!(err.failure_kind(), FailureKind::Process);
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let util = HostUtility::new("/nonexistent/dropship-util", vec![]);
        let err = util.run(["query"]).await.unwrap_err();
        assert!(matches!(err, HostError::Spawn { .. }));
    }
}
