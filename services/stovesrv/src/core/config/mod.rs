//! Service configuration
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. YAML file (`config/stovesrv.yaml` or `STOVESRV_CONFIG`), optional
//! 3. `STOVESRV_`-prefixed environment variables, nested keys split on `__`
//!    (e.g. `STOVESRV_SERIAL__PORT=/dev/ttyAMA0`)

pub mod types;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Result, StoveSrvError};

pub use types::{
    AppConfig, ControllerConfig, LinkConfig, LoggingConfig, MonitorConfig, SerialConfig,
    ServiceConfig,
};

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "STOVESRV_";

impl AppConfig {
    /// Load from `path` (if it exists) and the environment, then validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if path.exists() {
            debug!("Loading configuration from {}", path.display());
            figment = figment.merge(Yaml::file(path));
        } else {
            warn!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
        }

        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate from a prepared figment
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() && !self.serial.simulate {
            return Err(StoveSrvError::config("serial.port cannot be empty"));
        }
        if self.serial.baud_rate == 0 {
            return Err(StoveSrvError::config("serial.baud_rate must be positive"));
        }
        if self.serial.connect_timeout_ms == 0 {
            return Err(StoveSrvError::config(
                "serial.connect_timeout_ms must be positive",
            ));
        }

        let link = &self.link;
        if link.read_attempts == 0 || link.write_attempts == 0 {
            return Err(StoveSrvError::config(
                "link attempts must be at least 1",
            ));
        }
        let timeouts = [
            link.read_sync_timeout_ms,
            link.read_response_timeout_ms,
            link.write_sync_timeout_ms,
            link.write_response_timeout_ms,
            link.probe_timeout_ms,
        ];
        if timeouts.contains(&0) {
            return Err(StoveSrvError::config("link timeouts must be positive"));
        }

        let ctl = &self.controller;
        if !(ctl.min_temperature.is_finite() && ctl.max_temperature.is_finite()) {
            return Err(StoveSrvError::config("temperature limits must be finite"));
        }
        if ctl.min_temperature >= ctl.max_temperature {
            return Err(StoveSrvError::config(format!(
                "controller.min_temperature ({}) must be below max_temperature ({})",
                ctl.min_temperature, ctl.max_temperature
            )));
        }
        if !(ctl.min_temperature..=ctl.max_temperature).contains(&ctl.default_temperature) {
            return Err(StoveSrvError::config(format!(
                "controller.default_temperature ({}) outside [{}, {}]",
                ctl.default_temperature, ctl.min_temperature, ctl.max_temperature
            )));
        }

        if self.monitor.enabled && self.monitor.interval_ms == 0 {
            return Err(StoveSrvError::config(
                "monitor.interval_ms must be positive",
            ));
        }

        Ok(())
    }
}
