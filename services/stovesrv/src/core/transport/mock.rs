//! Simulated stove transport
//!
//! Behaves like the stove end of the serial line: emits SYNC frames at a fixed
//! interval while idle, answers read requests from a register table and echoes
//! write requests after applying them. Used by the integration tests and by the
//! service's simulated mode.
//!
//! Test code drives failure scenarios through a [`MockStoveHandle`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::traits::{Transport, TransportError, TransportStats};
use crate::protocols::palazzetti::constants::{
    CHRONO_DAY_SIZE, CHRONO_PROGRAM_SIZE, FRAME_SIZE, POWER_OFF, READ_ID, REGISTER_CHRONO_DAYS,
    REGISTER_CHRONO_PROGRAMS, REGISTER_CHRONO_SETPOINTS, REGISTER_CHRONO_STATUS,
    REGISTER_ERROR_CODE, REGISTER_ALARM_STATUS, REGISTER_PELLET_CONSUMPTION,
    REGISTER_POWER_CONTROL, REGISTER_POWER_LEVEL, REGISTER_SETPOINT, REGISTER_SETPOINT_2BYTES,
    REGISTER_SETPOINT_8BYTES, REGISTER_STATUS, REGISTER_TEMPERATURE, REGISTER_TIMER_SETTINGS,
    WRITE_ID,
};
use crate::protocols::palazzetti::frame::{Frame, RegisterAddress};

/// Byte-addressed chrono memory (programs, day slots, setpoint table)
const CHRONO_MEMORY: RangeInclusive<u16> = 0x8000..=0x80FF;

/// Status reported after a power-on command (HEAT UP)
const STATUS_AFTER_POWER_ON: u8 = 3;

/// Simulated stove configuration
#[derive(Debug, Clone)]
pub struct MockTransportConfig {
    pub name: String,
    /// Time between two SYNC frames while the line is idle
    pub heartbeat_interval: Duration,
    /// Default timeout for `receive(.., None)`
    pub read_timeout: Duration,
}

impl Default for MockTransportConfig {
    fn default() -> Self {
        Self {
            name: "simulated-stove".to_string(),
            heartbeat_interval: Duration::from_millis(100),
            read_timeout: Duration::from_millis(1000),
        }
    }
}

impl MockTransportConfig {
    pub fn with_heartbeat(heartbeat_interval: Duration) -> Self {
        Self {
            heartbeat_interval,
            ..Default::default()
        }
    }
}

/// Frame traffic observed by the simulated stove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireRequest {
    pub id: u8,
    pub address: RegisterAddress,
}

#[derive(Debug)]
struct SimulatedStove {
    connected: bool,
    heartbeat: bool,
    responding: bool,
    registers: HashMap<u16, Vec<u8>>,
    chrono_memory: HashMap<u16, u8>,
    failing: HashSet<u16>,
    corrupt_remaining: u32,
    outbound: VecDeque<u8>,
    last_heartbeat: Option<Instant>,
    requests: Vec<WireRequest>,
    writes: Vec<(RegisterAddress, Vec<u8>)>,
    stats: TransportStats,
}

impl SimulatedStove {
    fn new() -> Self {
        let mut stove = Self {
            connected: false,
            heartbeat: true,
            responding: true,
            registers: HashMap::new(),
            chrono_memory: HashMap::new(),
            failing: HashSet::new(),
            corrupt_remaining: 0,
            outbound: VecDeque::new(),
            last_heartbeat: None,
            requests: Vec::new(),
            writes: Vec::new(),
            stats: TransportStats::default(),
        };
        stove.load_defaults();
        stove
    }

    /// A stove switched off in a 21 °C room, setpoint 22 °C, two chrono programs
    fn load_defaults(&mut self) {
        let defaults: [(RegisterAddress, &[u8]); 12] = [
            (REGISTER_STATUS, &[0]),
            (REGISTER_TEMPERATURE, &[0xD2, 0x00]),
            (REGISTER_SETPOINT, &[110]),
            (REGISTER_SETPOINT_8BYTES, &[12, 110, 0, 0, 0, 0, 0, 0]),
            (REGISTER_SETPOINT_2BYTES, &[22, 0]),
            (REGISTER_POWER_CONTROL, &[POWER_OFF]),
            (REGISTER_POWER_LEVEL, &[3]),
            (REGISTER_ERROR_CODE, &[0, 0]),
            (REGISTER_ALARM_STATUS, &[0]),
            (REGISTER_TIMER_SETTINGS, &[0]),
            (REGISTER_PELLET_CONSUMPTION, &[0xD2, 0x04]),
            (REGISTER_CHRONO_STATUS, &[0x00]),
        ];
        for (address, value) in defaults {
            self.set_register(address, value);
        }

        self.store_chrono(REGISTER_CHRONO_PROGRAMS, &[6, 30, 9, 0]);
        self.store_chrono(REGISTER_CHRONO_PROGRAMS.offset(4), &[17, 0, 22, 30]);
        self.store_chrono(REGISTER_CHRONO_SETPOINTS, &[105, 110]);
        for day in 0..7u16 {
            let slots: &[u8] = if day < 5 { &[1, 2, 0] } else { &[2, 0, 0] };
            self.store_chrono(REGISTER_CHRONO_DAYS.offset(day * CHRONO_DAY_SIZE), slots);
        }
    }

    fn set_register(&mut self, address: RegisterAddress, value: &[u8]) {
        if CHRONO_MEMORY.contains(&address.value()) {
            self.store_chrono(address, value);
        } else {
            self.registers.insert(address.value(), value.to_vec());
        }
    }

    fn register(&self, address: RegisterAddress) -> Vec<u8> {
        if CHRONO_MEMORY.contains(&address.value()) {
            (0..9u16)
                .map(|i| {
                    self.chrono_memory
                        .get(&address.offset(i).value())
                        .copied()
                        .unwrap_or(0)
                })
                .collect()
        } else {
            self.registers
                .get(&address.value())
                .cloned()
                .unwrap_or_default()
        }
    }

    fn store_chrono(&mut self, address: RegisterAddress, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.chrono_memory
                .insert(address.offset(i as u16).value(), *byte);
        }
    }

    /// Width of a write at `address`: chrono cells have fixed sizes, other
    /// registers keep the whole value
    fn write_width(address: RegisterAddress) -> Option<usize> {
        let value = address.value();
        let days = REGISTER_CHRONO_DAYS.value();
        let setpoints = REGISTER_CHRONO_SETPOINTS.value();
        if !CHRONO_MEMORY.contains(&value) {
            None
        } else if value < days {
            Some(CHRONO_PROGRAM_SIZE as usize)
        } else if value < setpoints {
            Some(CHRONO_DAY_SIZE as usize)
        } else {
            Some(1)
        }
    }

    fn apply_write(&mut self, address: RegisterAddress, value: &[u8]) {
        match Self::write_width(address) {
            Some(width) => self.store_chrono(address, &value[..width.min(value.len())]),
            None => {
                self.registers.insert(address.value(), value.to_vec());
            },
        }

        if address == REGISTER_SETPOINT {
            if let Some(layout) = self.registers.get_mut(&REGISTER_SETPOINT_8BYTES.value()) {
                if layout.len() > 1 {
                    layout[1] = value[0];
                }
            }
        } else if address == REGISTER_POWER_CONTROL {
            let status = if value[0] == POWER_OFF {
                0
            } else {
                STATUS_AFTER_POWER_ON
            };
            self.registers.insert(REGISTER_STATUS.value(), vec![status]);
        }
    }

    fn handle_request(&mut self, data: &[u8]) {
        let Ok(request) = Frame::decode(data) else {
            return;
        };
        if !request.is_valid() {
            return;
        }

        let address = request.address();
        self.requests.push(WireRequest {
            id: request.id(),
            address,
        });

        if !self.responding || self.failing.contains(&address.value()) {
            return;
        }

        let response = match request.id() {
            READ_ID => Frame::new(READ_ID, &self.register(address)),
            WRITE_ID => {
                let value = request.payload()[2..].to_vec();
                self.writes.push((address, value.clone()));
                self.apply_write(address, &value);
                Frame::new(WRITE_ID, request.payload())
            },
            _ => return,
        };

        let mut bytes = response.encode();
        if self.corrupt_remaining > 0 {
            self.corrupt_remaining -= 1;
            bytes[FRAME_SIZE - 1] ^= 0xFF;
        }
        self.outbound.extend(bytes);
    }

    fn drain_into(&mut self, buffer: &mut [u8]) -> usize {
        let count = self.outbound.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(self.outbound.drain(..count)) {
            *slot = byte;
        }
        self.stats.record_received(count);
        count
    }
}

/// Test-side control of a simulated stove
#[derive(Debug, Clone)]
pub struct MockStoveHandle {
    state: Arc<Mutex<SimulatedStove>>,
}

impl MockStoveHandle {
    pub fn set_register(&self, address: RegisterAddress, value: &[u8]) {
        self.state.lock().set_register(address, value);
    }

    pub fn register(&self, address: RegisterAddress) -> Vec<u8> {
        self.state.lock().register(address)
    }

    /// Stop or resume SYNC frames
    pub fn set_heartbeat(&self, enabled: bool) {
        self.state.lock().heartbeat = enabled;
    }

    /// Stop or resume answering requests (heartbeats continue)
    pub fn set_responding(&self, responding: bool) {
        self.state.lock().responding = responding;
    }

    /// Never answer requests for `address`
    pub fn fail_register(&self, address: RegisterAddress) {
        self.state.lock().failing.insert(address.value());
    }

    pub fn restore_register(&self, address: RegisterAddress) {
        self.state.lock().failing.remove(&address.value());
    }

    /// Send the next `count` responses with a broken checksum
    pub fn corrupt_next_responses(&self, count: u32) {
        self.state.lock().corrupt_remaining = count;
    }

    /// Read requests received so far
    pub fn read_count(&self) -> usize {
        self.requests_with_id(READ_ID).len()
    }

    /// Write requests received so far
    pub fn write_count(&self) -> usize {
        self.requests_with_id(WRITE_ID).len()
    }

    /// Addresses of the read requests, in arrival order
    pub fn read_addresses(&self) -> Vec<RegisterAddress> {
        self.requests_with_id(READ_ID)
    }

    /// Value bytes of every applied write to `address`
    pub fn writes_to(&self, address: RegisterAddress) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.state.lock().requests.clone()
    }

    pub fn clear_log(&self) {
        let mut stove = self.state.lock();
        stove.requests.clear();
        stove.writes.clear();
    }

    fn requests_with_id(&self, id: u8) -> Vec<RegisterAddress> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.id == id)
            .map(|r| r.address)
            .collect()
    }
}

/// Transport backed by a simulated stove
#[derive(Debug)]
pub struct MockTransport {
    config: MockTransportConfig,
    state: Arc<Mutex<SimulatedStove>>,
}

impl MockTransport {
    pub fn new(config: MockTransportConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(SimulatedStove::new())),
        }
    }

    pub fn handle(&self) -> MockStoveHandle {
        MockStoveHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new(MockTransportConfig::default())
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn transport_type(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut stove = self.state.lock();
        stove.stats.record_open_attempt();
        stove.connected = true;
        stove.outbound.clear();
        stove.last_heartbeat = None;
        stove.stats.record_opened();
        debug!(name = %self.config.name, "Simulated stove connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut stove = self.state.lock();
        if stove.connected {
            stove.connected = false;
            stove.outbound.clear();
            stove.stats.record_closed();
            debug!(name = %self.config.name, "Simulated stove disconnected");
        }
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut stove = self.state.lock();
        if !stove.connected {
            return Err(TransportError::SendFailed("Not connected".to_string()));
        }
        stove.stats.record_sent(data.len());
        stove.handle_request(data);
        Ok(data.len())
    }

    async fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, TransportError> {
        let wait = timeout.unwrap_or(self.config.read_timeout);
        let deadline = Instant::now() + wait;

        loop {
            let next_heartbeat = {
                let mut stove = self.state.lock();
                if !stove.connected {
                    return Err(TransportError::ReceiveFailed("Not connected".to_string()));
                }
                if !stove.outbound.is_empty() {
                    return Ok(stove.drain_into(buffer));
                }
                if stove.heartbeat {
                    let now = Instant::now();
                    let due = stove
                        .last_heartbeat
                        .map_or(now, |last| last + self.config.heartbeat_interval);
                    if due <= now {
                        stove.last_heartbeat = Some(now);
                        stove.outbound.extend(Frame::sync().encode());
                        return Ok(stove.drain_into(buffer));
                    }
                    Some(due)
                } else {
                    None
                }
            };

            if Instant::now() >= deadline {
                return Err(TransportError::Timeout(format!(
                    "No data from simulated stove within {wait:?}"
                )));
            }
            let wake = next_heartbeat.map_or(deadline, |due| due.min(deadline));
            tokio::time::sleep_until(wake).await;
        }
    }

    async fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn stats(&self) -> TransportStats {
        self.state.lock().stats.clone()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::protocols::palazzetti::frame::{construct_read, construct_write};

    fn fast() -> MockTransport {
        MockTransport::new(MockTransportConfig::with_heartbeat(Duration::from_millis(5)))
    }

    async fn read_frame(transport: &mut MockTransport) -> Frame {
        let mut buf = [0u8; FRAME_SIZE];
        let n = transport
            .receive(&mut buf, Some(Duration::from_millis(200)))
            .await
            .unwrap();
        assert_eq!(n, FRAME_SIZE);
        Frame::decode(&buf).unwrap()
    }

    #[tokio::test]
    async fn test_emits_heartbeats_when_idle() {
        let mut transport = fast();
        transport.connect().await.unwrap();

        assert!(read_frame(&mut transport).await.is_sync());
        assert!(read_frame(&mut transport).await.is_sync());
        assert_eq!(transport.stats().await.bytes_received, 22);
    }

    #[tokio::test]
    async fn test_silent_stove_times_out() {
        let mut transport = fast();
        transport.handle().set_heartbeat(false);
        transport.connect().await.unwrap();

        let mut buf = [0u8; FRAME_SIZE];
        let result = transport
            .receive(&mut buf, Some(Duration::from_millis(20)))
            .await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_answers_read_requests() {
        let mut transport = fast();
        let handle = transport.handle();
        transport.connect().await.unwrap();

        let request = construct_read(REGISTER_TEMPERATURE);
        transport.send(&request.encode()).await.unwrap();

        let response = read_frame(&mut transport).await;
        assert!(response.is_valid());
        assert!(response.matches(&request));
        assert_eq!(&response.payload()[..2], &[0xD2, 0x00]);
        assert_eq!(handle.read_count(), 1);
        assert_eq!(handle.read_addresses(), vec![REGISTER_TEMPERATURE]);
    }

    #[tokio::test]
    async fn test_write_is_applied_and_echoed() {
        let mut transport = fast();
        let handle = transport.handle();
        transport.connect().await.unwrap();

        let request = construct_write(REGISTER_SETPOINT, &[105]).unwrap();
        transport.send(&request.encode()).await.unwrap();

        let echo = read_frame(&mut transport).await;
        assert_eq!(echo, request);
        assert_eq!(handle.register(REGISTER_SETPOINT_8BYTES)[1], 105);
        assert_eq!(handle.writes_to(REGISTER_SETPOINT).len(), 1);
    }

    #[tokio::test]
    async fn test_chrono_writes_keep_neighbours() {
        let mut transport = fast();
        let handle = transport.handle();
        transport.connect().await.unwrap();

        let request = construct_write(REGISTER_CHRONO_PROGRAMS, &[7, 0, 8, 0]).unwrap();
        transport.send(&request.encode()).await.unwrap();
        read_frame(&mut transport).await;

        let memory = handle.register(REGISTER_CHRONO_PROGRAMS);
        assert_eq!(&memory[..8], &[7, 0, 8, 0, 17, 0, 22, 30]);
    }

    #[tokio::test]
    async fn test_failing_register_and_corruption() {
        let mut transport = fast();
        let handle = transport.handle();
        transport.connect().await.unwrap();

        handle.fail_register(REGISTER_STATUS);
        transport
            .send(&construct_read(REGISTER_STATUS).encode())
            .await
            .unwrap();
        // Only heartbeats come back
        assert!(read_frame(&mut transport).await.is_sync());

        handle.corrupt_next_responses(1);
        transport
            .send(&construct_read(REGISTER_TEMPERATURE).encode())
            .await
            .unwrap();
        assert!(!read_frame(&mut transport).await.is_valid());
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let mut transport = fast();
        let mut buf = [0u8; FRAME_SIZE];
        assert!(transport.send(&[0u8; FRAME_SIZE]).await.is_err());
        assert!(transport.receive(&mut buf, None).await.is_err());
        assert!(!transport.is_connected().await);
    }
}
