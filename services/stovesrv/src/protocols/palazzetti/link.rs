//! Heartbeat-synchronized request/response link
//!
//! The stove owns the bus: it emits a SYNC frame whenever it is ready to
//! accept a request. Every exchange therefore waits for a SYNC, writes the
//! request, then waits for a valid frame carrying the same id.
//!
//! The session mutex is the exchange lock. Exactly one exchange is on the wire
//! at a time and `disconnect` waits for an in-flight exchange to finish.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use super::frame::{construct_read, construct_write, Frame, FrameError, FrameReader, RegisterAddress};
use crate::core::transport::{SerialTransport, SerialTransportConfig, Transport};

const READ_CHUNK: usize = 64;

/// Pause after a zero-length read so a closed line cannot spin
const EMPTY_READ_BACKOFF: Duration = Duration::from_millis(10);

/// Retry budget for one kind of exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeBudget {
    pub attempts: u32,
    pub sync_timeout: Duration,
    pub response_timeout: Duration,
}

impl ExchangeBudget {
    pub const fn new(attempts: u32, sync_timeout: Duration, response_timeout: Duration) -> Self {
        Self {
            attempts,
            sync_timeout,
            response_timeout,
        }
    }
}

/// Budgets used by `send_read` / `send_write` and the liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangePolicy {
    pub read: ExchangeBudget,
    pub write: ExchangeBudget,
    pub probe_timeout: Duration,
}

impl Default for ExchangePolicy {
    fn default() -> Self {
        Self {
            read: ExchangeBudget::new(5, Duration::from_secs(2), Duration::from_secs(1)),
            write: ExchangeBudget::new(2, Duration::from_secs(5), Duration::from_secs(5)),
            probe_timeout: Duration::from_secs(3),
        }
    }
}

/// Why a single attempt did not produce a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttemptFailure {
    SyncTimeout,
    ResponseTimeout,
    WriteFailed,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AttemptFailure::SyncTimeout => "no SYNC frame",
            AttemptFailure::ResponseTimeout => "no matching response",
            AttemptFailure::WriteFailed => "request write failed",
        };
        f.write_str(text)
    }
}

/// Exchange errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Serial link unavailable")]
    LinkUnavailable,

    #[error("No valid response after {attempts} attempts ({last})")]
    Exhausted { attempts: u32, last: AttemptFailure },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Link counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub exchanges: u64,
    pub retries: u64,
    pub failures: u64,
    pub discarded_bytes: u64,
    pub probes: u64,
    pub failed_probes: u64,
}

#[derive(Debug)]
struct LinkSession {
    transport: Box<dyn Transport>,
    reader: FrameReader,
}

impl LinkSession {
    fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            reader: FrameReader::new(),
        }
    }

    /// First valid frame accepted by `accept` within `timeout`
    ///
    /// Valid frames that are not accepted are dropped.
    async fn wait_for<F>(&mut self, timeout: Duration, accept: F) -> Option<Frame>
    where
        F: Fn(&Frame) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; READ_CHUNK];

        loop {
            while let Some(frame) = self.reader.next_frame() {
                if accept(&frame) {
                    return Some(frame);
                }
                trace!(frame = %frame, "Skipping frame");
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }

            match self.transport.receive(&mut buf, Some(remaining)).await {
                Ok(0) => tokio::time::sleep(EMPTY_READ_BACKOFF.min(remaining)).await,
                Ok(n) => self.reader.push(&buf[..n]),
                Err(e) if e.is_timeout() => return None,
                Err(e) => {
                    warn!(error = %e, "Serial read failed");
                    return None;
                },
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.transport.disconnect().await {
            warn!(error = %e, "Error closing transport");
        }
        self.reader.clear();
    }
}

/// Owner of the physical link
#[derive(Debug)]
pub struct LinkTransport {
    session: Mutex<Option<LinkSession>>,
    policy: ExchangePolicy,
    stats: parking_lot::Mutex<LinkStats>,
}

impl Default for LinkTransport {
    fn default() -> Self {
        Self::new(ExchangePolicy::default())
    }
}

impl LinkTransport {
    pub fn new(policy: ExchangePolicy) -> Self {
        Self {
            session: Mutex::new(None),
            policy,
            stats: parking_lot::Mutex::new(LinkStats::default()),
        }
    }

    pub fn policy(&self) -> &ExchangePolicy {
        &self.policy
    }

    pub fn stats(&self) -> LinkStats {
        self.stats.lock().clone()
    }

    /// Open the serial port (8N2) and wait up to `timeout` for a SYNC frame
    pub async fn connect(&self, port: &str, baud_rate: u32, timeout: Duration) -> bool {
        let transport = match SerialTransport::new(SerialTransportConfig::new(port, baud_rate)) {
            Ok(t) => t,
            Err(e) => {
                error!(port, error = %e, "Invalid serial configuration");
                return false;
            },
        };
        self.connect_with(Box::new(transport), timeout).await
    }

    /// Take ownership of `transport`, open it and wait for a SYNC frame
    ///
    /// Without a heartbeat the transport is closed again and `false` returned.
    pub async fn connect_with(&self, mut transport: Box<dyn Transport>, timeout: Duration) -> bool {
        let mut guard = self.session.lock().await;
        if let Some(mut previous) = guard.take() {
            previous.close().await;
        }

        if let Err(e) = transport.connect().await {
            error!(link = transport.name(), error = %e, "Failed to open link");
            return false;
        }

        let mut session = LinkSession::new(transport);
        let synced = session.wait_for(timeout, Frame::is_sync).await.is_some();
        self.record_discarded(&mut session);

        if synced {
            info!(
                link = session.transport.name(),
                transport = session.transport.transport_type(),
                "Link established, heartbeat received"
            );
            *guard = Some(session);
            true
        } else {
            warn!(
                link = session.transport.name(),
                timeout_ms = timeout.as_millis() as u64,
                "No SYNC frame from stove, closing link"
            );
            session.close().await;
            false
        }
    }

    pub async fn disconnect(&self) {
        let mut guard = self.session.lock().await;
        if let Some(mut session) = guard.take() {
            session.close().await;
            let traffic = session.transport.stats().await;
            info!(
                link = session.transport.name(),
                bytes_sent = traffic.bytes_sent,
                bytes_received = traffic.bytes_received,
                "Link closed"
            );
        }
    }

    /// Liveness probe with the configured probe timeout
    pub async fn is_connected(&self) -> bool {
        self.probe(self.policy.probe_timeout).await
    }

    /// Wait up to `timeout` for a SYNC frame on the open link
    pub async fn probe(&self, timeout: Duration) -> bool {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return false;
        };

        let alive = session.wait_for(timeout, Frame::is_sync).await.is_some();
        self.record_discarded(session);

        let mut stats = self.stats.lock();
        stats.probes += 1;
        if !alive {
            stats.failed_probes += 1;
            debug!(timeout_ms = timeout.as_millis() as u64, "Liveness probe saw no SYNC");
        }
        alive
    }

    pub async fn send_read(&self, address: RegisterAddress) -> Result<Frame, ExchangeError> {
        self.exchange(&construct_read(address), &self.policy.read)
            .await
    }

    pub async fn send_write(
        &self,
        address: RegisterAddress,
        value: &[u8],
    ) -> Result<Frame, ExchangeError> {
        let request = construct_write(address, value)?;
        self.exchange(&request, &self.policy.write).await
    }

    /// One synchronized request/response exchange
    ///
    /// Exhaustion leaves the link open; only a failed probe means it is gone.
    pub async fn exchange(
        &self,
        request: &Frame,
        budget: &ExchangeBudget,
    ) -> Result<Frame, ExchangeError> {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return Err(ExchangeError::LinkUnavailable);
        };

        self.stats.lock().exchanges += 1;
        let bytes = request.encode();
        let address = request.address();
        let mut last = AttemptFailure::SyncTimeout;

        for attempt in 1..=budget.attempts {
            if attempt > 1 {
                self.stats.lock().retries += 1;
            }

            if session
                .wait_for(budget.sync_timeout, Frame::is_sync)
                .await
                .is_none()
            {
                debug!(%address, attempt, "No SYNC before request");
                last = AttemptFailure::SyncTimeout;
                continue;
            }

            if let Err(e) = session.transport.send(&bytes).await {
                warn!(%address, attempt, error = %e, "Failed to write request");
                last = AttemptFailure::WriteFailed;
                continue;
            }
            debug!(
                hex_data = %common::hex::format_spaced(&bytes),
                %address,
                attempt,
                direction = "send",
                "Request frame"
            );

            match session
                .wait_for(budget.response_timeout, |f| f.matches(request))
                .await
            {
                Some(response) => {
                    self.record_discarded(session);
                    debug!(
                        hex_data = %common::hex::format_spaced(&response.encode()),
                        %address,
                        attempt,
                        direction = "recv",
                        "Response frame"
                    );
                    return Ok(response);
                },
                None => {
                    debug!(%address, attempt, "No matching response");
                    last = AttemptFailure::ResponseTimeout;
                },
            }
        }

        self.record_discarded(session);
        self.stats.lock().failures += 1;
        warn!(
            %address,
            attempts = budget.attempts,
            last = %last,
            "Exchange failed"
        );
        Err(ExchangeError::Exhausted {
            attempts: budget.attempts,
            last,
        })
    }

    fn record_discarded(&self, session: &mut LinkSession) {
        let discarded = session.reader.take_discarded();
        if discarded > 0 {
            debug!(discarded, "Dropped bytes while resynchronizing");
            self.stats.lock().discarded_bytes += discarded;
        }
    }
}
