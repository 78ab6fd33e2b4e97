// ABOUTME: ConfigStore backed by JSON configuration files.
// ABOUTME: Files hold an appSettings map and a connectionStrings map.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AppConfig, ConfigStore, HostError};

/// On-disk shape: `{ "appSettings": {..}, "connectionStrings": {..} }`.
///
/// Other top-level entries are preserved when the file is rewritten.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    app_settings: BTreeMap<String, String>,
    #[serde(default)]
    connection_strings: BTreeMap<String, String>,
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConfigStore;

impl JsonConfigStore {
    pub fn new() -> Self {
        Self
    }

    fn load(path: &Path) -> Result<ConfigFile, HostError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                HostError::ConfigNotFound(path.to_path_buf())
            } else {
                HostError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&content).map_err(|source| HostError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ConfigStore for JsonConfigStore {
    fn read(&self, path: &Path, connection_name: &str) -> Result<AppConfig, HostError> {
        let mut file = Self::load(path)?;
        Ok(AppConfig {
            connection_string: file.connection_strings.remove(connection_name),
            app_settings: file.app_settings,
        })
    }

    fn write(
        &self,
        path: &Path,
        connection_name: &str,
        config: &AppConfig,
    ) -> Result<(), HostError> {
        let mut file = Self::load(path)?;
        file.app_settings.extend(
            config
                .app_settings
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        if let Some(connection_string) = &config.connection_string {
            file.connection_strings
                .insert(connection_name.to_string(), connection_string.clone());
        }

        let json = serde_json::to_string_pretty(&file).map_err(|source| HostError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json + "\n").map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "configuration written");
        Ok(())
    }
}
