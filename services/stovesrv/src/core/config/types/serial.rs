//! Serial line and link budget configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocols::palazzetti::constants::DEFAULT_BAUD_RATE;
use crate::protocols::palazzetti::{ExchangeBudget, ExchangePolicy};

/// Serial line configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial device path
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// How long `connect` waits for the first SYNC frame
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Run against the built-in stove simulator instead of a serial port
    #[serde(default)]
    pub simulate: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            connect_timeout_ms: default_connect_timeout_ms(),
            simulate: false,
        }
    }
}

impl SerialConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Retry budgets for reads, writes and the liveness probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,

    #[serde(default = "default_read_sync_timeout_ms")]
    pub read_sync_timeout_ms: u64,

    #[serde(default = "default_read_response_timeout_ms")]
    pub read_response_timeout_ms: u64,

    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,

    #[serde(default = "default_write_timeout_ms")]
    pub write_sync_timeout_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_response_timeout_ms: u64,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_attempts: default_read_attempts(),
            read_sync_timeout_ms: default_read_sync_timeout_ms(),
            read_response_timeout_ms: default_read_response_timeout_ms(),
            write_attempts: default_write_attempts(),
            write_sync_timeout_ms: default_write_timeout_ms(),
            write_response_timeout_ms: default_write_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl LinkConfig {
    pub fn policy(&self) -> ExchangePolicy {
        ExchangePolicy {
            read: ExchangeBudget::new(
                self.read_attempts,
                Duration::from_millis(self.read_sync_timeout_ms),
                Duration::from_millis(self.read_response_timeout_ms),
            ),
            write: ExchangeBudget::new(
                self.write_attempts,
                Duration::from_millis(self.write_sync_timeout_ms),
                Duration::from_millis(self.write_response_timeout_ms),
            ),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_read_attempts() -> u32 {
    5
}

fn default_read_sync_timeout_ms() -> u64 {
    2_000
}

fn default_read_response_timeout_ms() -> u64 {
    1_000
}

fn default_write_attempts() -> u32 {
    2
}

fn default_write_timeout_ms() -> u64 {
    5_000
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}
