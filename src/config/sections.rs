// ABOUTME: Typed config sections: endpoints, transport tuning, host utilities, migrations.
// ABOUTME: Every section has defaults so a minimal dropship.yml stays short.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::hooks::ConversionPhase;
use crate::host::HostUtility;
use crate::transport::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_MESSAGE_SIZE, Framing};
use crate::types::ScriptVersion;

pub const DEFAULT_PORT: u16 = 7420;

/// An address and port pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    #[default]
    LengthPrefixed,
    ShortRead,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub framing: FramingMode,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Received packages waiting for the installer.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// How long `serve` waits for open sessions after a shutdown signal.
    #[serde(default = "default_shutdown_grace", with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            framing: FramingMode::default(),
            buffer_size: default_buffer_size(),
            max_message_size: default_max_message_size(),
            queue_depth: default_queue_depth(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

impl TransportConfig {
    pub fn framing(&self) -> Framing {
        match self.framing {
            FramingMode::LengthPrefixed => Framing::LengthPrefixed {
                max_message_size: self.max_message_size,
            },
            FramingMode::ShortRead => Framing::short_read(self.buffer_size),
        }
    }
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

fn default_queue_depth() -> usize {
    16
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(30)
}

/// Utilities driving the service manager and the web server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostsConfig {
    #[serde(default = "default_service_util")]
    pub service_util: HostUtility,
    #[serde(default = "default_web_util")]
    pub web_util: HostUtility,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            service_util: default_service_util(),
            web_util: default_web_util(),
        }
    }
}

fn default_service_util() -> HostUtility {
    HostUtility::new("dropship-svc", Vec::new())
}

fn default_web_util() -> HostUtility {
    HostUtility::new("dropship-web", Vec::new())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MigrationsConfig {
    /// Directory of `.sql` scripts, relative to the release root when not absolute.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
    #[serde(default)]
    pub conversions: Vec<ConversionConfig>,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            conversions: Vec::new(),
        }
    }
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("Database")
}

/// An external program run around one script version.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversionConfig {
    pub name: String,
    pub version: ScriptVersion,
    #[serde(default = "default_phase")]
    pub phase: ConversionPhase,
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_phase() -> ConversionPhase {
    ConversionPhase::After
}
