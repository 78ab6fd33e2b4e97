// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes; renders outcomes and warnings.

use serde::Serialize;
use std::time::Instant;

use crate::diagnostics::Warning;
use crate::outcome::{FailureKind, Outcome};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

impl OutputMode {
    pub fn from_flags(quiet: bool, json: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.emit_stdout(&JsonEvent {
                event: "success",
                message,
                kind: None,
                warnings: &[],
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.emit_stderr(&JsonEvent {
                event: "error",
                message,
                kind: None,
                warnings: &[],
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print a warning (suppressed in quiet mode).
    pub fn warning(&self, warning: &Warning) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {}", warning.message),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit_stderr(&JsonEvent {
                event: "warning",
                message: &warning.message,
                kind: None,
                warnings: &[],
                duration_secs: None,
            }),
        }
    }

    /// Report an orchestration outcome: warnings, then the final line.
    pub fn outcome(&self, outcome: &Outcome) {
        if self.mode == OutputMode::Json {
            let event = JsonEvent {
                event: if outcome.success { "success" } else { "failure" },
                message: &outcome.message,
                kind: outcome.failure,
                warnings: &outcome.warnings,
                duration_secs: self.duration(),
            };
            if outcome.success {
                self.emit_stdout(&event);
            } else {
                self.emit_stderr(&event);
            }
            return;
        }

        for warning in &outcome.warnings {
            self.warning(warning);
        }
        if outcome.success {
            self.success(&outcome.message);
        } else {
            self.error(&outcome.message);
        }
    }

    fn emit_stdout(&self, event: &JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            println!("{json}");
        }
    }

    fn emit_stderr(&self, event: &JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            eprintln!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "no_warnings")]
    warnings: &'a [Warning],
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

fn no_warnings(warnings: &&[Warning]) -> bool {
    warnings.is_empty()
}
