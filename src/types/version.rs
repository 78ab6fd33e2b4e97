// ABOUTME: Version types for migration scripts and release packages.
// ABOUTME: Script versions are decimal numbers; release versions are dotted numerics.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version cannot be empty")]
    Empty,

    #[error("invalid script version: '{0}'")]
    InvalidScriptVersion(String),

    #[error("script version must be a finite, non-negative number: '{0}'")]
    OutOfRange(String),

    #[error("invalid release version component '{component}' in '{value}'")]
    InvalidReleaseComponent { value: String, component: String },
}

/// Version of a migration script, parsed from the file name prefix.
///
/// Versions are decimal (`2.5` sorts between `2` and `3`). Zero is reserved
/// for scripts that never run as part of an incremental update.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ScriptVersion(f64);

impl ScriptVersion {
    pub const ZERO: ScriptVersion = ScriptVersion(0.0);

    pub fn new(value: f64) -> Result<Self, VersionError> {
        if !value.is_finite() || value < 0.0 {
            return Err(VersionError::OutOfRange(value.to_string()));
        }
        // -0.0 and 0.0 must compare equal under total ordering
        Ok(Self(value + 0.0))
    }

    pub fn parse(value: &str) -> Result<Self, VersionError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        let number = trimmed
            .parse::<f64>()
            .map_err(|_| VersionError::InvalidScriptVersion(trimmed.to_string()))?;
        Self::new(number)
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl PartialEq for ScriptVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScriptVersion {}

impl PartialOrd for ScriptVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScriptVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for ScriptVersion {
    type Error = VersionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScriptVersion> for f64 {
    fn from(version: ScriptVersion) -> Self {
        version.0
    }
}

impl FromStr for ScriptVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ScriptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dotted numeric release version such as `2.1.0.17`.
///
/// Missing trailing components compare as zero, so `1.2` equals `1.2.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion {
    components: Vec<u64>,
}

impl ReleaseVersion {
    pub fn parse(value: &str) -> Result<Self, VersionError> {
        let trimmed = value.trim().trim_start_matches(['v', 'V']);
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let components = trimmed
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| VersionError::InvalidReleaseComponent {
                        value: value.to_string(),
                        component: part.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { components })
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReleaseVersion {}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReleaseVersion> for String {
    fn from(value: ReleaseVersion) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}
