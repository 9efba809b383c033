//! Daemon settings for tunnelmgrd
//!
//! Loads and validates settings from a TOML file.
//! Default location: /etc/tunnelmgrd/tunnelmgrd.toml
//!
//! These are properties of the daemon, not of any tunnel; tunnels come
//! from the merged configuration tree.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TunnelError};
use crate::types::DEFAULT_BASE_MTU;

/// Default settings file
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/tunnelmgrd/tunnelmgrd.toml";

/// Link handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Device MTU tunnel MTUs are derived from when not configured
    #[serde(default = "default_base_mtu")]
    pub base_mtu: u32,

    /// Interfaces reconciled concurrently
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

/// Logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Complete tunnelmgrd settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub link: LinkSettings,

    #[serde(default)]
    pub log: LogSettings,
}

fn default_base_mtu() -> u32 {
    DEFAULT_BASE_MTU
}

fn default_max_parallel() -> usize {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            base_mtu: default_base_mtu(),
            max_parallel: default_max_parallel(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                TunnelError::Settings(format!(
                    "failed to parse {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // logging is not initialized yet
                eprintln!(
                    "tunnelmgrd: settings file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(TunnelError::Settings(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if !(576..=65535).contains(&self.link.base_mtu) {
            return Err(TunnelError::Settings(
                "base_mtu must be 576-65535".to_string(),
            ));
        }

        if self.link.max_parallel == 0 {
            return Err(TunnelError::Settings(
                "max_parallel must be > 0".to_string(),
            ));
        }

        if self.log.level.parse::<tracing::Level>().is_err() {
            return Err(TunnelError::Settings(format!(
                "unknown log level \"{}\"",
                self.log.level
            )));
        }

        Ok(())
    }
}
