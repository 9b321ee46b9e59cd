//! RS-232 link to the stove
//!
//! The stove line runs at a fixed 8 data bits, no parity, 2 stop bits.

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, error, info};

use super::traits::{LinkState, Transport, TransportError, TransportStats};
use crate::protocols::palazzetti::constants::DEFAULT_BAUD_RATE;

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(1);

/// Port path, speed and I/O limits for [`SerialTransport`]
#[derive(Debug, Clone)]
pub struct SerialTransportConfig {
    /// Device path, e.g. "/dev/ttyUSB0" or "COM3"
    pub port: String,
    pub baud_rate: u32,
    /// Used by `receive` when the caller passes no timeout
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for SerialTransportConfig {
    fn default() -> Self {
        Self::new("/dev/ttyUSB0", DEFAULT_BAUD_RATE)
    }
}

impl SerialTransportConfig {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            read_timeout: DEFAULT_IO_TIMEOUT,
            write_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<(), TransportError> {
        let problem = if self.port.trim().is_empty() {
            Some("serial port path is empty")
        } else if self.baud_rate == 0 {
            Some("baud rate must be non-zero")
        } else if self.read_timeout.is_zero() || self.write_timeout.is_zero() {
            Some("serial I/O timeouts must be non-zero")
        } else {
            None
        };

        match problem {
            Some(msg) => Err(TransportError::ConfigError(msg.to_string())),
            None => Ok(()),
        }
    }
}

/// Stove link over a local serial device
#[derive(Debug)]
pub struct SerialTransport {
    config: SerialTransportConfig,
    stream: Option<SerialStream>,
    stats: TransportStats,
}

impl SerialTransport {
    pub fn new(config: SerialTransportConfig) -> Result<Self, TransportError> {
        config.validate()?;
        Ok(Self {
            config,
            stream: None,
            stats: TransportStats::default(),
        })
    }

    pub fn config(&self) -> &SerialTransportConfig {
        &self.config
    }

    fn open_stream(&self) -> io::Result<SerialStream> {
        let mut stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::Two)
            .flow_control(FlowControl::None)
            .timeout(self.config.read_timeout)
            .open_native_async()?;

        #[cfg(unix)]
        stream.set_exclusive(false)?;

        Ok(stream)
    }

    /// A hard I/O error means the device is gone; later calls see a closed link
    fn fault(&mut self, op: &str, err: &io::Error) {
        error!(port = %self.config.port, op, error = %err, "Serial I/O failed, dropping port");
        self.stream = None;
        self.stats.state = LinkState::Faulted;
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn transport_type(&self) -> &str {
        "serial"
    }

    fn name(&self) -> &str {
        &self.config.port
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.stats.record_open_attempt();

        match self.open_stream() {
            Ok(stream) => {
                self.stream = Some(stream);
                self.stats.record_opened();
                info!(
                    port = %self.config.port,
                    baud_rate = self.config.baud_rate,
                    "Serial port open (8N2)"
                );
                Ok(())
            },
            Err(e) => {
                self.stats.record_open_failed();
                error!(port = %self.config.port, error = %e, "Cannot open serial port");
                Err(TransportError::ConnectionFailed(format!(
                    "{}: {e}",
                    self.config.port
                )))
            },
        }
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        // Dropping the stream releases the device
        if self.stream.take().is_some() {
            self.stats.record_closed();
            info!(port = %self.config.port, "Serial port closed");
        }
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let write_timeout = self.config.write_timeout;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::SendFailed("serial port is closed".to_string()))?;

        let outcome = tokio::time::timeout(write_timeout, async {
            stream.write_all(data).await?;
            stream.flush().await
        })
        .await;

        match outcome {
            Ok(Ok(())) => {
                self.stats.record_sent(data.len());
                debug!(
                    hex_data = %common::hex::format_spaced(data),
                    length = data.len(),
                    direction = "tx",
                    "Serial frame"
                );
                Ok(data.len())
            },
            Ok(Err(e)) => {
                self.fault("write", &e);
                Err(TransportError::SendFailed(e.to_string()))
            },
            Err(_) => Err(TransportError::Timeout(format!(
                "write not drained within {write_timeout:?}"
            ))),
        }
    }

    async fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, TransportError> {
        let wait = timeout.unwrap_or(self.config.read_timeout);
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::ReceiveFailed("serial port is closed".to_string()))?;

        match tokio::time::timeout(wait, stream.read(buffer)).await {
            Ok(Ok(n)) => {
                if n > 0 {
                    self.stats.record_received(n);
                    debug!(
                        hex_data = %common::hex::format_spaced(&buffer[..n]),
                        length = n,
                        direction = "rx",
                        "Serial frame"
                    );
                }
                Ok(n)
            },
            // The driver-level read timeout and the outer deadline mean the same thing here
            Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => {
                Err(TransportError::Timeout(format!("no bytes within {wait:?}")))
            },
            Ok(Err(e)) => {
                self.fault("read", &e);
                Err(TransportError::ReceiveFailed(e.to_string()))
            },
            Err(_) => Err(TransportError::Timeout(format!("no bytes within {wait:?}"))),
        }
    }

    async fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn stats(&self) -> TransportStats {
        self.stats.clone()
    }
}
