// ABOUTME: Validated AppFolder names.
// ABOUTME: Names become directory components, so path separators are rejected.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FolderNameError {
    #[error("folder name cannot be empty")]
    Empty,

    #[error("folder name cannot be '.' or '..'")]
    Relative,

    #[error("invalid character in folder name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderName(String);

impl FolderName {
    pub fn new(value: &str) -> Result<Self, FolderNameError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(FolderNameError::Empty);
        }

        if trimmed == "." || trimmed == ".." {
            return Err(FolderNameError::Relative);
        }

        for c in trimmed.chars() {
            if matches!(c, '/' | '\\' | ':' | '\0') || c.is_control() {
                return Err(FolderNameError::InvalidChar(c));
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<std::path::Path> for FolderName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}
