//! Controller and monitor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Setpoint limits and state cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Lowest accepted setpoint (°C)
    #[serde(default = "default_min_temperature")]
    pub min_temperature: f32,

    /// Highest accepted setpoint (°C)
    #[serde(default = "default_max_temperature")]
    pub max_temperature: f32,

    /// Placeholder temperature/setpoint before the first refresh
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Window in which `get_state` serves the cached snapshot
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_temperature: default_min_temperature(),
            max_temperature: default_max_temperature(),
            default_temperature: default_temperature(),
            cache_ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl ControllerConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

/// Background refresh loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_monitor_interval_ms")]
    pub interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_monitor_interval_ms(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_min_temperature() -> f32 {
    15.0
}

fn default_max_temperature() -> f32 {
    27.0
}

fn default_temperature() -> f32 {
    22.0
}

fn default_cache_ttl_ms() -> u64 {
    10_000
}

fn default_monitor_interval_ms() -> u64 {
    60_000
}
