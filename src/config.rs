//! Configuration management for the monitor
//!
//! Loads an optional YAML file; every field has a default so the monitor
//! runs without one.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::protocol::DEVICE_NAME_PREFIX;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device discovery and transport settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Port names must start with this
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Client name registered with the MIDI subsystem
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Depth of the inbound event queue
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

/// Loop cadences
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_display_refresh")]
    pub display_refresh_ms: u64,
}

/// Log file output
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            client_name: default_client_name(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval(),
            poll_interval_ms: default_poll_interval(),
            display_refresh_ms: default_display_refresh(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_prefix: default_log_file_prefix(),
        }
    }
}

impl TimingConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn display_refresh(&self) -> Duration {
        Duration::from_millis(self.display_refresh_ms)
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path).await
        } else {
            info!("Config file '{}' not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.device.name_prefix.is_empty() {
            anyhow::bail!("device.name_prefix cannot be empty");
        }
        if self.device.client_name.is_empty() {
            anyhow::bail!("device.client_name cannot be empty");
        }
        if self.device.buffer_size == 0 {
            anyhow::bail!("device.buffer_size must be greater than 0");
        }

        for (field, value) in [
            ("retry_interval_ms", self.timing.retry_interval_ms),
            ("poll_interval_ms", self.timing.poll_interval_ms),
            ("display_refresh_ms", self.timing.display_refresh_ms),
        ] {
            if value == 0 {
                anyhow::bail!("timing.{} must be greater than 0", field);
            }
        }

        if self.logging.file_prefix.is_empty() {
            anyhow::bail!("logging.file_prefix cannot be empty");
        }

        Ok(())
    }
}

// Default value functions
fn default_name_prefix() -> String { DEVICE_NAME_PREFIX.to_string() }
fn default_client_name() -> String { "profiler-monitor".to_string() }
fn default_buffer_size() -> usize { 100 }
fn default_retry_interval() -> u64 { 1000 }
fn default_poll_interval() -> u64 { 50 }
fn default_display_refresh() -> u64 { 100 }
fn default_log_directory() -> String { "logs".to_string() }
fn default_log_file_prefix() -> String { "profiler-monitor.log".to_string() }
