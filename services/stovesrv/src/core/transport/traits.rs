//! Byte-level link to the stove
//!
//! A transport only moves bytes. Framing, SYNC handling and retries live one
//! layer up in the protocol link.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Nothing arrived in time; the link itself may be fine
    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Invalid transport configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Closed,
    Opening,
    Open,
    /// Open failed or the device went away mid-write
    Faulted,
}

/// Counters kept by every transport
#[derive(Debug, Clone, Serialize)]
pub struct TransportStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub open_attempts: u64,
    pub open_failures: u64,
    pub closes: u64,
    pub opened_at: Option<DateTime<Utc>>,
    pub state: LinkState,
}

impl Default for TransportStats {
    fn default() -> Self {
        Self {
            bytes_sent: 0,
            bytes_received: 0,
            open_attempts: 0,
            open_failures: 0,
            closes: 0,
            opened_at: None,
            state: LinkState::Closed,
        }
    }
}

impl TransportStats {
    pub fn record_open_attempt(&mut self) {
        self.open_attempts += 1;
        self.state = LinkState::Opening;
    }

    pub fn record_opened(&mut self) {
        self.opened_at = Some(Utc::now());
        self.state = LinkState::Open;
    }

    pub fn record_open_failed(&mut self) {
        self.open_failures += 1;
        self.state = LinkState::Faulted;
    }

    pub fn record_closed(&mut self) {
        self.closes += 1;
        self.state = LinkState::Closed;
    }

    pub fn record_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
    }

    pub fn record_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
    }
}

/// Physical link to the stove
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Short kind identifier ("serial", "mock")
    fn transport_type(&self) -> &str;

    /// Device path or simulator name
    fn name(&self) -> &str;

    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the link; closing a closed link is not an error
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Write all of `data`, returning the number of bytes sent
    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read whatever is available into `buffer`
    ///
    /// Blocks until at least one byte arrives or `timeout` elapses, in which
    /// case `TransportError::Timeout` is returned. `None` uses the transport's
    /// configured read timeout.
    async fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, TransportError>;

    async fn is_connected(&self) -> bool;

    async fn stats(&self) -> TransportStats;
}
