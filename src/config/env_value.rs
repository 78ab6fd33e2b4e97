// ABOUTME: Secret-bearing config values that may be read from the environment.
// ABOUTME: A literal string or `{ env: VAR, default: ... }`.

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        let value = EnvValue::Literal("s3cret".to_string());
        assert_eq!(value.resolve().unwrap(), "s3cret");
    }

    #[test]
    fn env_reference_prefers_environment() {
        let value = EnvValue::FromEnv {
            var: "DROPSHIP_UNIT_KEY".to_string(),
            default: Some("fallback".to_string()),
        };
        temp_env::with_var("DROPSHIP_UNIT_KEY", Some("from-env"), || {
            assert_eq!(value.resolve().unwrap(), "from-env");
        });
        temp_env::with_var_unset("DROPSHIP_UNIT_KEY", || {
            assert_eq!(value.resolve().unwrap(), "fallback");
        });
    }

    #[test]
    fn unset_variable_without_default_is_an_error() {
        let value = EnvValue::FromEnv {
            var: "DROPSHIP_UNIT_MISSING".to_string(),
            default: None,
        };
        temp_env::with_var_unset("DROPSHIP_UNIT_MISSING", || {
            assert!(matches!(value.resolve(), Err(Error::MissingEnvVar(v)) if v == "DROPSHIP_UNIT_MISSING"));
        });
    }
}
