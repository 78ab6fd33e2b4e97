// ABOUTME: Serde representation of AppInfo.json as written by packaging tools.
// ABOUTME: Converted into the validated ReleaseManifest model before use.

use chrono::{DateTime, NaiveDateTime};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashSet;

use super::{AppFolder, AppFolderKind, ManifestError, ReleaseManifest};
use crate::types::FolderName;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawManifest {
    product_name: String,
    version: String,
    #[serde(default, deserialize_with = "deserialize_date")]
    date_created: Option<NaiveDateTime>,
    update_executable_name: String,
    #[serde(default)]
    app_folders: Vec<RawFolder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawFolder {
    name: String,
    type_name: String,
    #[serde(default)]
    connection_string_name: Option<String>,
    #[serde(default)]
    assembly_name: Option<String>,
    #[serde(default)]
    web_application_name: Option<String>,
    #[serde(default)]
    web_application_pool_name: Option<String>,
    #[serde(default)]
    service_name: Option<String>,
}

impl RawManifest {
    pub(super) fn validate(self) -> Result<ReleaseManifest, ManifestError> {
        require_text("ProductName", &self.product_name)?;
        require_text("Version", &self.version)?;
        require_text("UpdateExecutableName", &self.update_executable_name)?;

        let mut seen = HashSet::new();
        let mut folders = Vec::with_capacity(self.app_folders.len());
        for raw in self.app_folders {
            let folder = raw.validate()?;
            if !seen.insert(folder.name().clone()) {
                return Err(ManifestError::DuplicateFolder(folder.name().to_string()));
            }
            folders.push(folder);
        }

        let app_folders = NonEmpty::from_vec(folders).ok_or(ManifestError::NoFolders)?;

        Ok(ReleaseManifest::from_parts(
            self.product_name.trim().to_string(),
            self.version.trim().to_string(),
            self.date_created,
            self.update_executable_name.trim().to_string(),
            app_folders,
        ))
    }
}

impl RawFolder {
    fn validate(self) -> Result<AppFolder, ManifestError> {
        let name = FolderName::new(&self.name).map_err(|e| ManifestError::InvalidField {
            field: "Name",
            reason: e.to_string(),
        })?;
        let folder = name.to_string();

        let kind = match self.type_name.trim().to_ascii_lowercase().as_str() {
            "web" => AppFolderKind::Web {
                application_name: required(&folder, "WebApplicationName", self.web_application_name)?,
                pool_name: required(&folder, "WebApplicationPoolName", self.web_application_pool_name)?,
            },
            "service" => AppFolderKind::Service {
                service_name: required(&folder, "ServiceName", self.service_name)?,
            },
            "resource" => AppFolderKind::Resource,
            _ => {
                return Err(ManifestError::UnknownFolderType {
                    folder,
                    type_name: self.type_name,
                });
            }
        };

        Ok(AppFolder::new(
            name,
            kind,
            self.connection_string_name.unwrap_or_default(),
            required(&folder, "AssemblyName", self.assembly_name)?,
        ))
    }
}

fn required(
    folder: &str,
    field: &'static str,
    value: Option<String>,
) -> Result<String, ManifestError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ManifestError::MissingField {
            folder: folder.to_string(),
            field,
        }),
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ManifestError> {
    if value.trim().is_empty() {
        return Err(ManifestError::InvalidField {
            field,
            reason: "value cannot be empty".to_string(),
        });
    }
    Ok(())
}

/// Accepts RFC 3339 timestamps and the offset-less form .NET serializers emit.
fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    let Some(value) = value else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&value) {
        return Ok(Some(parsed.naive_utc()));
    }

    NaiveDateTime::parse_from_str(&value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(Some)
        .map_err(serde::de::Error::custom)
}
