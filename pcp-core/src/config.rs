//! Data source configuration.

use crate::error::{PcpError, Result};
use crate::interval::parse_interval;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "PCP_POLL_CONFIG";

/// Persistent configuration for a PCP data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// pmproxy base URL (e.g. `http://localhost:44322`).
    pub url: String,
    pub hostspec: String,
    /// How much history to keep per series.
    pub retention_time: String,
    /// Default poll cadence, overridden by the dashboard refresh interval.
    pub refresh_interval: String,
    /// Subscriptions not requested for this long stop being polled.
    pub metric_max_age: String,
    pub api_timeout: String,
    /// Port for the Prometheus exporter; disabled when unset.
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: "http://localhost:44322".to_string(),
            hostspec: "pcp://127.0.0.1".to_string(),
            retention_time: "30m".to_string(),
            refresh_interval: "1s".to_string(),
            metric_max_age: "20s".to_string(),
            api_timeout: "10s".to_string(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pcp-poll")
            .join("config.json")
    }

    /// Load configuration from disk, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| PcpError::InvalidConfig {
            reason: format!("Failed to read config: {}", e),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| PcpError::InvalidConfig {
            reason: format!("Failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PcpError::IoError { path: parent.to_path_buf(), source: e })?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| PcpError::InvalidConfig {
            reason: format!("Failed to serialize config: {}", e),
        })?;
        std::fs::write(&path, content).map_err(|e| PcpError::IoError { path, source: e })
    }

    /// Check that every interval field parses.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(PcpError::InvalidConfig {
                reason: "Please specify a connection URL".to_string(),
            });
        }
        self.retention()?;
        self.refresh()?;
        self.max_age()?;
        self.timeout()?;
        Ok(())
    }

    pub fn retention(&self) -> Result<Duration> {
        parse_interval(&self.retention_time)
    }

    pub fn refresh(&self) -> Result<Duration> {
        parse_interval(&self.refresh_interval)
    }

    pub fn max_age(&self) -> Result<Duration> {
        parse_interval(&self.metric_max_age)
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_interval(&self.api_timeout)
    }
}
