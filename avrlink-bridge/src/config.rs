//! Bridge configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via AVRLINK_CONFIG)
//! 3. Environment variables

use avrlink_client::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Receiver connection.
    pub receiver: ReceiverConfig,
    /// Key-value store.
    pub store: StoreConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("AVRLINK_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::Parse(_, msg) => ConfigError::Parse(path.to_path_buf(), msg),
            other => other,
        })
    }

    /// Parses configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e.to_string()))
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.receiver.apply_env_overrides();
        self.store.apply_env_overrides();
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.receiver.validate()?;
        self.store.validate()
    }
}

/// Receiver connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Receiver host name or address.
    pub host: String,
    /// Receiver control port.
    pub port: u16,
    /// Connect (and idle) timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Metadata poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Delay before reconnecting after a close, in milliseconds.
    pub reconnect_delay_ms: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: avrlink_protocol::DEFAULT_PORT,
            connect_timeout_ms: 500,
            poll_interval_ms: 2500,
            reconnect_delay_ms: 2500,
        }
    }
}

impl ReceiverConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(host) = env_any(&["AVRLINK_HOST", "DENON_HOST"]) {
            self.host = host;
        }

        if let Some(port) = env_any(&["AVRLINK_PORT", "DENON_PORT"]) {
            if let Ok(parsed) = port.parse() {
                self.port = parsed;
            }
        }

        if let Ok(timeout) = std::env::var("AVRLINK_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.connect_timeout_ms = ms;
            }
        }

        if let Ok(interval) = std::env::var("AVRLINK_POLL_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                self.poll_interval_ms = ms;
            }
        }

        if let Ok(delay) = std::env::var("AVRLINK_RECONNECT_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                self.reconnect_delay_ms = ms;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "receiver.host not set".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation(
                "receiver.port must be non-zero".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 || self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "receiver timeouts and intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Returns the client connection configuration.
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.host.clone(), self.port)
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_reconnect_delay(self.reconnect_delay())
    }
}

/// Key-value store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the REST database. If unset, an in-memory store is used.
    pub url: Option<String>,
    /// Path under which fields are mirrored and write requests are read.
    pub path: String,
    /// Interval between write-request polls, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: "status".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

impl StoreConfig {
    fn apply_env_overrides(&mut self) {
        if let Some(url) = env_any(&["AVRLINK_STORE_URL", "FIREBASE_URL"]) {
            if !url.is_empty() {
                self.url = Some(url);
            }
        }

        if let Ok(path) = std::env::var("AVRLINK_STORE_PATH") {
            self.path = path;
        }

        if let Ok(interval) = std::env::var("AVRLINK_STORE_POLL_MS") {
            if let Ok(ms) = interval.parse() {
                self.poll_interval_ms = ms;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "store.poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.path.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation("store.path not set".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Returns the first set environment variable among `names`.
fn env_any(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| std::env::var(name).ok())
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse config file '{}': {}", .0.display(), .1)]
    Parse(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
