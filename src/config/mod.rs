// ABOUTME: Configuration types and parsing for dropship.yml.
// ABOUTME: Discovers the config file, resolves the integrity key, and builds components.

mod env_value;
mod init;
mod sections;

pub use env_value::EnvValue;
pub use init::init_config;
pub use sections::{
    ConversionConfig, DEFAULT_PORT, Endpoint, FramingMode, HostsConfig, MigrationsConfig,
    TransportConfig,
};

use crate::error::{Error, Result};
use crate::hooks::{CommandConversion, ConversionRegistry};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CONFIG_FILENAME: &str = "dropship.yml";
pub const CONFIG_FILENAME_ALT: &str = "dropship.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".dropship/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where `serve` accepts packages.
    #[serde(default)]
    pub listen: Option<Endpoint>,

    /// Where `push` sends packages.
    #[serde(default)]
    pub push: Option<Endpoint>,

    pub integrity_key: EnvValue,

    pub base_update_path: PathBuf,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub hosts: HostsConfig,

    #[serde(default)]
    pub migrations: MigrationsConfig,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Like [`Config::discover`], but also searches every parent of `dir`.
    ///
    /// Update executables run inside an extracted release, below the directory
    /// that holds the daemon's config.
    pub fn discover_upwards(dir: &Path) -> Result<Self> {
        for ancestor in dir.ancestors() {
            match Self::discover(ancestor) {
                Err(Error::ConfigNotFound(_)) => continue,
                found => return found,
            }
        }
        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.transport.queue_depth == 0 {
            return Err(Error::InvalidConfig(
                "transport.queue_depth must be at least 1".to_string(),
            ));
        }
        if self.transport.max_message_size == 0 {
            return Err(Error::InvalidConfig(
                "transport.max_message_size must be at least 1".to_string(),
            ));
        }
        if let EnvValue::Literal(key) = &self.integrity_key
            && key.is_empty()
        {
            return Err(Error::InvalidConfig(
                "integrity_key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_endpoint(&self) -> Result<&Endpoint> {
        self.listen
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("no listen endpoint configured".to_string()))
    }

    pub fn push_endpoint(&self) -> Result<&Endpoint> {
        self.push
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("no push endpoint configured".to_string()))
    }

    /// Scripts directory, resolved against `root` when relative.
    pub fn scripts_dir(&self, root: &Path) -> PathBuf {
        if self.migrations.scripts_dir.is_absolute() {
            self.migrations.scripts_dir.clone()
        } else {
            root.join(&self.migrations.scripts_dir)
        }
    }

    /// Conversion routines declared under `migrations.conversions`.
    pub fn conversions(&self) -> ConversionRegistry {
        let mut registry = ConversionRegistry::new();
        for conversion in &self.migrations.conversions {
            registry.register(
                conversion.version,
                conversion.phase,
                Arc::new(CommandConversion::new(
                    &conversion.name,
                    &conversion.program,
                    conversion.args.clone(),
                    conversion.phase,
                )),
            );
        }
        registry
    }
}
