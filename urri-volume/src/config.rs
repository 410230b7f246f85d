//! Per-accessory configuration
//!
//! Matches the accessory entry of a smart-home bridge config file:
//!
//! ```json
//! {
//!   "accessory": "URRI Volume",
//!   "name": "Living Room Receiver",
//!   "address": "192.168.1.40",
//!   "defaultVolume": 15,
//!   "refreshInterval": 1000
//! }
//! ```
//!
//! Unknown keys such as `accessory` are ignored.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::Volume;

pub const DEFAULT_ADDRESS: &str = "localhost";
pub const DEFAULT_VOLUME: u8 = 10;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;

/// Errors loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for one receiver accessory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryConfig {
    /// Display name of the accessory
    pub name: String,

    /// Host name or IP address of the receiver
    /// Default: "localhost"
    #[serde(default = "default_address")]
    pub address: String,

    /// Volume applied when the light is switched on from off
    /// Default: 10
    #[serde(default = "default_volume")]
    pub default_volume: u8,

    /// Poll interval in milliseconds
    /// Default: 1000
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Per-request timeout in milliseconds; unset means no timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_volume() -> u8 {
    DEFAULT_VOLUME
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

impl AccessoryConfig {
    /// Create a configuration with default values for everything but the name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: default_address(),
            default_volume: DEFAULT_VOLUME,
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
            request_timeout: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: AccessoryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".to_string()));
        }

        if self.address.trim().is_empty() {
            return Err(ConfigError::Invalid("address must not be empty".to_string()));
        }

        if self.default_volume > Volume::MAX.value() {
            return Err(ConfigError::Invalid(format!(
                "defaultVolume must be between 0 and 100, got {}",
                self.default_volume
            )));
        }

        if self.refresh_interval == 0 {
            return Err(ConfigError::Invalid(
                "refreshInterval must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout == Some(0) {
            return Err(ConfigError::Invalid(
                "requestTimeout must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    pub fn default_on_volume(&self) -> Volume {
        Volume::new(self.default_volume)
    }

    pub fn refresh_interval_duration(&self) -> Duration {
        Duration::from_millis(self.refresh_interval)
    }

    pub fn request_timeout_duration(&self) -> Option<Duration> {
        self.request_timeout.map(Duration::from_millis)
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_default_volume(mut self, volume: u8) -> Self {
        self.default_volume = volume;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}
