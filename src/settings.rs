// src/settings.rs
//
// Bridge settings: defaults, the JSON settings file, and the loose option
// maps handed over by the host driver framework.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::IoError;

/// Option map as passed to `init` / `subscribe` by the host framework
pub type DriverOptions = HashMap<String, Value>;

/// Option keys understood by the bridge
pub const OPT_RETRY_INTERVAL: &str = "retry_interval";
pub const OPT_RETRY_INTERVAL_MS: &str = "retry_interval_ms";
pub const OPT_READ_TIMEOUT_MS: &str = "read_timeout_ms";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BridgeSettings {
    /// Serial port to look for, e.g. "/dev/ttyUSB0" or "COM3"
    #[serde(default)]
    pub port_name: Option<String>,
    #[serde(default = "default_retry_interval")]
    pub retry_interval: u64, // seconds
    /// Overrides `retry_interval` when set
    #[serde(default)]
    pub retry_interval_ms: Option<u64>,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Directory for log files (None = stderr only)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_retry_interval() -> u64 {
    5
}
fn default_read_timeout_ms() -> u64 {
    250
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            port_name: None,
            retry_interval: default_retry_interval(),
            retry_interval_ms: None,
            read_timeout_ms: default_read_timeout_ms(),
            log_dir: None,
        }
    }
}

impl BridgeSettings {
    /// Pause between discovery scans and between open attempts
    pub fn retry_interval(&self) -> Duration {
        match self.retry_interval_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_secs(self.retry_interval),
        }
    }

    /// Serial read timeout; bounds how long a listener takes to notice a stop
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Merge a host option map into these settings.
    /// Unknown keys are ignored; known keys with the wrong type are rejected.
    pub fn apply_options(&mut self, options: &DriverOptions) -> Result<(), IoError> {
        if let Some(v) = options.get(OPT_RETRY_INTERVAL) {
            self.retry_interval = option_u64(OPT_RETRY_INTERVAL, v)?;
            self.retry_interval_ms = None;
        }
        if let Some(v) = options.get(OPT_RETRY_INTERVAL_MS) {
            self.retry_interval_ms = Some(option_u64(OPT_RETRY_INTERVAL_MS, v)?);
        }
        if let Some(v) = options.get(OPT_READ_TIMEOUT_MS) {
            self.read_timeout_ms = option_u64(OPT_READ_TIMEOUT_MS, v)?;
        }
        Ok(())
    }

    pub fn from_options(options: &DriverOptions) -> Result<Self, IoError> {
        let mut settings = Self::default();
        settings.apply_options(options)?;
        Ok(settings)
    }
}

fn option_u64(key: &str, value: &Value) -> Result<u64, IoError> {
    value
        .as_u64()
        .ok_or_else(|| IoError::config(format!("option '{}' must be a non-negative integer, got {}", key, value)))
}

/// Default settings file location: `<config dir>/pulseox-bridge/settings.json`
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pulseox-bridge").join("settings.json"))
}

/// Load settings from `path`. A missing file yields the defaults.
pub fn load_settings_from(path: &Path) -> Result<BridgeSettings, IoError> {
    if !path.exists() {
        return Ok(BridgeSettings::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| IoError::config(format!("Failed to read settings: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| IoError::config(format!("Failed to parse settings: {}", e)))
}

/// Load settings from the default location
pub fn load_settings() -> Result<BridgeSettings, IoError> {
    match default_settings_path() {
        Some(path) => load_settings_from(&path),
        None => Ok(BridgeSettings::default()),
    }
}

pub fn save_settings_to(path: &Path, settings: &BridgeSettings) -> Result<(), IoError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| IoError::config(format!("Failed to create settings dir: {}", e)))?;
    }
    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| IoError::config(format!("Failed to serialize settings: {}", e)))?;
    std::fs::write(path, content)
        .map_err(|e| IoError::config(format!("Failed to write settings: {}", e)))
}
