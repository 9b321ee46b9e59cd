//! Application configuration root

use serde::{Deserialize, Serialize};

use super::{ControllerConfig, LinkConfig, LoggingConfig, MonitorConfig, SerialConfig};

/// Application configuration root structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    /// Physical line
    #[serde(default)]
    pub serial: SerialConfig,

    /// Exchange retry budgets
    #[serde(default)]
    pub link: LinkConfig,

    /// Setpoint limits and state cache
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Background refresh loop
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Service identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    pub description: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            description: None,
        }
    }
}

fn default_service_name() -> String {
    "stovesrv".to_string()
}
