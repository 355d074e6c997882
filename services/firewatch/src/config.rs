//! Configuration types for the firewatch service

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default = "default_archive_path")]
    pub archive_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            aggregator: AggregatorConfig::default(),
            dashboard: DashboardConfig::default(),
            archive_path: default_archive_path(),
        }
    }
}

/// Telemetry source endpoint and polling cadences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Seconds between device roster refreshes
    #[serde(default = "default_device_poll_seconds")]
    pub device_poll_seconds: u64,
    /// Seconds between latest-reading polls for the monitored device
    #[serde(default = "default_reading_poll_seconds")]
    pub reading_poll_seconds: u64,
    /// Device to monitor at startup; the first device in the roster is
    /// selected when unset
    #[serde(default)]
    pub device_id: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            device_poll_seconds: default_device_poll_seconds(),
            reading_poll_seconds: default_reading_poll_seconds(),
            device_id: None,
        }
    }
}

/// Session aggregation tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Minimum elapsed time between merged updates of an active session
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Temperature change that bypasses the time throttle
    #[serde(default = "default_temperature_delta")]
    pub temperature_delta: f64,
    /// Smoke-level change that bypasses the time throttle
    #[serde(default = "default_smoke_delta")]
    pub smoke_delta: f64,
    /// Humidity change that bypasses the time throttle
    #[serde(default = "default_humidity_delta")]
    pub humidity_delta: f64,
    /// Readings retained per session
    #[serde(default = "default_session_readings_cap")]
    pub session_readings_cap: usize,
    /// Completed sessions retained in the archive
    #[serde(default = "default_archive_cap")]
    pub archive_cap: usize,
    /// Raw readings retained per device for display and deduplication
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            temperature_delta: default_temperature_delta(),
            smoke_delta: default_smoke_delta(),
            humidity_delta: default_humidity_delta(),
            session_readings_cap: default_session_readings_cap(),
            archive_cap: default_archive_cap(),
            history_cap: default_history_cap(),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:9000/api".to_string()
}

fn default_device_poll_seconds() -> u64 {
    30
}

fn default_reading_poll_seconds() -> u64 {
    10
}

fn default_throttle_ms() -> u64 {
    5000
}

fn default_temperature_delta() -> f64 {
    1.0
}

fn default_smoke_delta() -> f64 {
    5.0
}

fn default_humidity_delta() -> f64 {
    2.0
}

fn default_session_readings_cap() -> usize {
    50
}

fn default_archive_cap() -> usize {
    10
}

fn default_history_cap() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    9114
}

fn default_archive_path() -> String {
    "firewatch-sessions.json".to_string()
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::FirewatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
