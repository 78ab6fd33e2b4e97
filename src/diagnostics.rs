// ABOUTME: Diagnostics accumulator for non-fatal warnings during deployment.
// ABOUTME: Collects warnings that shouldn't fail a deployment but should be shown to users.

use serde::Serialize;

/// Collects non-fatal warnings during deployment operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// No connection string was available for a newly installed component.
    pub fn missing_connection_string(folder: &str) -> Self {
        Self {
            kind: WarningKind::MissingConnectionString,
            message: format!(
                "no connection string supplied for {folder}; its configuration was left unchanged"
            ),
        }
    }

    /// A reinstalled service did not start.
    pub fn service_start_failed(service: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            kind: WarningKind::ServiceStartFailed,
            message: format!("service {service} was installed but did not start: {reason}"),
        }
    }

    /// Settings of the installed copy could not be carried into the new release.
    pub fn config_not_carried(folder: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            kind: WarningKind::ConfigNotCarried,
            message: format!("configuration of {folder} was not carried forward: {reason}"),
        }
    }

    /// The installed release stamp could not be read, so the folder is deployed anyway.
    pub fn release_stamp_unreadable(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self {
            kind: WarningKind::ReleaseStampUnreadable,
            message: format!("ignoring unreadable release stamp {}: {reason}", path.display()),
        }
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MissingConnectionString,
    /// Reinstall succeeded; the service needs a manual start.
    ServiceStartFailed,
    ConfigNotCarried,
    ReleaseStampUnreadable,
}
