// ABOUTME: Uniform result of a migration or deployment step.
// ABOUTME: Carries success, a human message, collected warnings, and a failure category.

use serde::Serialize;
use std::fmt;

use crate::diagnostics::{Diagnostics, Warning};

/// Why a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad input: wrong key, missing manifest, unknown folder, missing connection string.
    Validation,
    Connectivity,
    Migration,
    /// A web host or service host operation was refused.
    HostOperation,
    /// An external program failed to start or exited non-zero.
    Process,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Validation => "validation",
            FailureKind::Connectivity => "connectivity",
            FailureKind::Migration => "migration",
            FailureKind::HostOperation => "host operation",
            FailureKind::Process => "process",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            warnings: Vec::new(),
            failure: None,
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(failure = %kind, "{message}");
        Self {
            success: false,
            message,
            warnings: Vec::new(),
            failure: Some(kind),
        }
    }

    /// Attach the warnings collected while producing this outcome.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.warnings.extend(diagnostics.into_warnings());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
