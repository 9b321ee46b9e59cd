//! Device controller
//!
//! Owns the link and the authoritative [`DeviceState`]. Readers get a
//! time-boxed cached snapshot; whole refresh sequences are serialized so a
//! burst of callers triggers a single pass on the wire.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::admission::{OperationGate, OP_CHRONO_READ, OP_CHRONO_WRITE, OP_STATE_REFRESH};
use super::state::{
    ChronoData, DeviceState, ReadFailure, RefreshOutcome, RegisterRead, LINK_LOST_MESSAGE,
};
use crate::core::config::ControllerConfig;
use crate::core::transport::Transport;
use crate::error::{Result, StoveSrvError};
use crate::protocols::palazzetti::constants::{
    CHRONO_DAY_COUNT, CHRONO_PROGRAM_COUNT, FLUID_PELLET, POWER_OFF, POWER_ON,
    REGISTER_ALARM_STATUS, REGISTER_CHRONO_SETPOINTS, REGISTER_CHRONO_STATUS, REGISTER_ERROR_CODE,
    REGISTER_PELLET_CONSUMPTION, REGISTER_POWER_CONTROL, REGISTER_POWER_LEVEL, REGISTER_SETPOINT,
    REGISTER_SETPOINT_8BYTES, REGISTER_STATUS, REGISTER_TEMPERATURE, STATUS_ERROR_RANGE,
};
use crate::protocols::palazzetti::registers::{
    self, day_address, encode_chrono_day, encode_chrono_program, encode_setpoint,
    is_chrono_enabled, parse_byte, parse_chrono_day, parse_chrono_program,
    parse_chrono_setpoints, parse_power_level, parse_setpoint, parse_status, parse_temperature,
    parse_word, program_address, program_setpoint_address, set_enable_bit,
    validate_power_level, ChronoProgram,
};
use crate::protocols::palazzetti::{
    ExchangeError, LinkStats, LinkTransport, RegisterAddress, RegisterError, StoveStatus,
};

fn invalid(err: RegisterError) -> StoveSrvError {
    StoveSrvError::validation(err.to_string())
}

/// Stateful front end to one stove
#[derive(Debug)]
pub struct DeviceController {
    link: LinkTransport,
    config: ControllerConfig,
    state: RwLock<DeviceState>,
    last_refresh_at: Mutex<Option<Instant>>,
    /// Serializes whole refresh sequences
    refresh_lock: tokio::sync::Mutex<()>,
    gate: OperationGate,
}

impl DeviceController {
    pub fn new(link: LinkTransport, config: ControllerConfig) -> Self {
        let state = DeviceState::new(config.default_temperature);
        Self {
            link,
            config,
            state: RwLock::new(state),
            last_refresh_at: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            gate: OperationGate::new(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn link_stats(&self) -> LinkStats {
        self.link.stats()
    }

    /// Current snapshot without any I/O
    pub fn snapshot(&self) -> DeviceState {
        self.state.read().clone()
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Open the serial port and wait up to `timeout` for a heartbeat
    pub async fn connect(&self, port: &str, baud_rate: u32, timeout: Duration) -> bool {
        let connected = self.link.connect(port, baud_rate, timeout).await;
        self.on_connect(connected);
        connected
    }

    /// Connect over an already constructed transport
    pub async fn connect_with(&self, transport: Box<dyn Transport>, timeout: Duration) -> bool {
        let connected = self.link.connect_with(transport, timeout).await;
        self.on_connect(connected);
        connected
    }

    fn on_connect(&self, connected: bool) {
        {
            let mut state = self.state.write();
            state.connected = connected;
            state.synchronized = false;
            if connected {
                state.error_message.clear();
            }
        }
        self.invalidate_cache();
        if connected {
            info!("Stove connected");
        } else {
            warn!("Stove not reachable");
        }
    }

    pub async fn disconnect(&self) {
        self.link.disconnect().await;
        {
            let mut state = self.state.write();
            state.connected = false;
            state.synchronized = false;
        }
        self.invalidate_cache();
        info!("Stove disconnected");
    }

    /// Liveness probe; updates the snapshot's connection flags
    pub async fn is_connected(&self) -> bool {
        self.probe_link().await
    }

    async fn probe_link(&self) -> bool {
        let alive = self.link.is_connected().await;
        let lost = {
            let mut state = self.state.write();
            if alive {
                state.connected = true;
                if state.error_message == LINK_LOST_MESSAGE {
                    state.error_message.clear();
                }
                false
            } else {
                let was_connected = state.connected;
                state.mark_link_lost();
                was_connected
            }
        };
        if !alive {
            self.invalidate_cache();
        }
        if lost {
            warn!("{}", LINK_LOST_MESSAGE);
        }
        alive
    }

    // ========================================================================
    // State reads
    // ========================================================================

    /// Snapshot, refreshed from the stove once the cache TTL has expired
    pub async fn get_state(&self) -> DeviceState {
        if !self.probe_link().await {
            return self.snapshot();
        }
        if self.cache_is_fresh() {
            return self.snapshot();
        }

        let _refresh = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited
        if self.cache_is_fresh() {
            debug!("Serving state refreshed by a concurrent caller");
            return self.snapshot();
        }
        self.refresh().await
    }

    /// Refresh regardless of the cache TTL
    pub async fn force_state_refresh(&self) -> DeviceState {
        if !self.probe_link().await {
            return self.snapshot();
        }
        let _refresh = self.refresh_lock.lock().await;
        self.refresh().await
    }

    fn cache_is_fresh(&self) -> bool {
        self.last_refresh_at
            .lock()
            .is_some_and(|at| at.elapsed() < self.config.cache_ttl())
    }

    fn invalidate_cache(&self) {
        *self.last_refresh_at.lock() = None;
    }

    /// Full read sequence; caller holds `refresh_lock`
    async fn refresh(&self) -> DeviceState {
        let _permit = self.gate.acquire(OP_STATE_REFRESH).await;
        let started = Instant::now();

        let status = self.read_register(REGISTER_STATUS, parse_status).await;
        let temperature = self
            .read_register(REGISTER_TEMPERATURE, parse_temperature)
            .await;
        let setpoint = self
            .read_register(REGISTER_SETPOINT_8BYTES, |p| parse_setpoint(p, FLUID_PELLET))
            .await;

        let status_code = match &status {
            Ok(reading) => reading.code,
            Err(_) => self.state.read().status_code,
        };
        let in_error_status = STATUS_ERROR_RANGE.contains(&status_code);

        // Error statuses carry their own message; the E-code register is skipped
        let error_code = if in_error_status {
            None
        } else {
            Some(self.read_register(REGISTER_ERROR_CODE, parse_word).await)
        };
        let alarm = self.read_register(REGISTER_ALARM_STATUS, parse_byte).await;
        let timer = self
            .read_register(REGISTER_CHRONO_STATUS, |p| parse_byte(p).map(is_chrono_enabled))
            .await;
        let power_level = self
            .read_register(REGISTER_POWER_LEVEL, parse_power_level)
            .await;

        let outcome = RefreshOutcome {
            status_ok: status.is_ok(),
            temperature_ok: temperature.is_ok(),
            setpoint_ok: setpoint.is_ok(),
        };

        let snapshot = {
            let mut state = self.state.write();

            if let Ok(reading) = status {
                state.status = StoveStatus::from_code(reading.code);
                state.status_code = reading.code;
                state.status_name = reading.name;
                state.power = reading.power_on;
            }
            if let Ok(value) = temperature {
                state.temperature = value;
            }
            if let Ok(reading) = setpoint {
                state.setpoint = reading.setpoint;
                state.seco = reading.seco;
                state.beco = reading.beco;
                state.setpoint_confirmed = true;
            }

            if in_error_status {
                state.error_code = u16::from(status_code);
                state.error_message = registers::error_message(u16::from(status_code));
            } else if let Some(Ok(code)) = error_code {
                state.error_code = code;
                state.error_message = registers::error_message(code);
            }

            if let Ok(value) = alarm {
                state.alarm_status = value;
            }
            if let Ok(enabled) = timer {
                state.timer_enabled = enabled;
            }
            if let Ok(level) = power_level {
                state.power_level = level;
            }

            // A disconnect may have landed between two reads of this pass
            state.synchronized = state.connected && outcome.meets_quorum();
            state.last_refresh = Some(Utc::now());
            state.clone()
        };
        if snapshot.connected {
            *self.last_refresh_at.lock() = Some(Instant::now());
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if snapshot.synchronized {
            info!(
                duration_ms = elapsed_ms,
                reads_ok = outcome.succeeded(),
                status = %snapshot.status_name,
                temperature = snapshot.temperature,
                setpoint = snapshot.setpoint,
                power = snapshot.power,
                "State refreshed ({}/3 primary reads)",
                outcome.succeeded()
            );
        } else {
            warn!(
                duration_ms = elapsed_ms,
                reads_ok = outcome.succeeded(),
                "State refresh below quorum ({}/3 primary reads), keeping stale values",
                outcome.succeeded()
            );
        }

        snapshot
    }

    async fn read_register<T, F>(&self, address: RegisterAddress, decode: F) -> RegisterRead<T>
    where
        F: FnOnce(&[u8]) -> std::result::Result<T, RegisterError>,
    {
        match self.link.send_read(address).await {
            Ok(frame) => decode(frame.payload()).map_err(|e| {
                warn!(%address, error = %e, "Failed to decode register");
                ReadFailure::Decode(e)
            }),
            Err(e) => {
                warn!(%address, error = %e, "Register read failed");
                Err(ReadFailure::Link(e))
            },
        }
    }

    /// Fresh pellet counter read
    pub async fn get_pellet_consumption(&self) -> Option<u32> {
        self.read_register(REGISTER_PELLET_CONSUMPTION, parse_word)
            .await
            .ok()
            .map(u32::from)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn validate_setpoint(&self, value: f32) -> Result<()> {
        let (min, max) = (self.config.min_temperature, self.config.max_temperature);
        if !value.is_finite() || value < min || value > max {
            return Err(StoveSrvError::validation(format!(
                "Setpoint {value} outside [{min}, {max}]"
            )));
        }
        Ok(())
    }

    /// Write a new setpoint
    ///
    /// `Ok(true)` only when the stove acknowledged the write. Out-of-range
    /// values are rejected before any I/O.
    pub async fn set_temperature(&self, value: f32) -> Result<bool> {
        self.validate_setpoint(value)?;
        let bytes = encode_setpoint(value, FLUID_PELLET).map_err(invalid)?;

        let acknowledged = match self.link.send_write(REGISTER_SETPOINT, &bytes).await {
            Ok(_) => {
                info!(setpoint = value, "Setpoint written");
                true
            },
            Err(ExchangeError::LinkUnavailable) => {
                warn!(setpoint = value, "Setpoint not written, link unavailable");
                return Ok(false);
            },
            Err(e) => {
                error!(setpoint = value, error = %e, "Setpoint write not acknowledged");
                false
            },
        };

        {
            let mut state = self.state.write();
            state.setpoint = value;
            state.setpoint_confirmed = false;
        }
        self.force_state_refresh().await;
        Ok(acknowledged)
    }

    /// Switch the stove on or off
    pub async fn set_power(&self, on: bool) -> bool {
        let code = if on { POWER_ON } else { POWER_OFF };
        match self.link.send_write(REGISTER_POWER_CONTROL, &[code]).await {
            Ok(_) => {
                info!(power = on, "Power command acknowledged");
                self.state.write().power = on;
                self.force_state_refresh().await;
                true
            },
            Err(e) => {
                error!(power = on, error = %e, "Power command failed");
                false
            },
        }
    }

    /// Set the burn power level (1-5)
    pub async fn set_power_level(&self, level: u8) -> Result<bool> {
        validate_power_level(level).map_err(invalid)?;
        match self.link.send_write(REGISTER_POWER_LEVEL, &[level]).await {
            Ok(_) => {
                info!(level, "Power level written");
                self.state.write().power_level = level;
                self.invalidate_cache();
                Ok(true)
            },
            Err(e) => {
                error!(level, error = %e, "Power level write failed");
                Ok(false)
            },
        }
    }

    // ========================================================================
    // Chrono
    // ========================================================================

    /// Read all chrono programs, day schedules and the enable flag
    ///
    /// Any failed read aborts the whole operation.
    pub async fn get_chrono_data(&self) -> Option<ChronoData> {
        let _permit = self.gate.acquire(OP_CHRONO_READ).await;
        match self.read_chrono().await {
            Ok(data) => {
                let mut state = self.state.write();
                state.chrono_programs = data.programs.clone();
                state.chrono_days = data.days.clone();
                state.timer_enabled = data.timer_enabled;
                Some(data)
            },
            Err(e) => {
                warn!(error = %e, "Chrono read aborted");
                None
            },
        }
    }

    async fn read_chrono(&self) -> std::result::Result<ChronoData, ReadFailure> {
        let setpoints = self
            .read_register(REGISTER_CHRONO_SETPOINTS, parse_chrono_setpoints)
            .await?;

        let mut programs = Vec::with_capacity(usize::from(CHRONO_PROGRAM_COUNT));
        for number in 1..=CHRONO_PROGRAM_COUNT {
            let address = program_address(number).map_err(ReadFailure::Decode)?;
            let raw = setpoints[usize::from(number - 1)];
            let program = self
                .read_register(address, |p| parse_chrono_program(number, p, raw))
                .await?;
            programs.push(program);
        }

        let mut days = Vec::with_capacity(usize::from(CHRONO_DAY_COUNT));
        for day in 1..=CHRONO_DAY_COUNT {
            let address = day_address(day).map_err(ReadFailure::Decode)?;
            days.push(
                self.read_register(address, |p| parse_chrono_day(day, p))
                    .await?,
            );
        }

        let timer_enabled = self
            .read_register(REGISTER_CHRONO_STATUS, |p| parse_byte(p).map(is_chrono_enabled))
            .await?;

        Ok(ChronoData {
            programs,
            days,
            timer_enabled,
        })
    }

    /// Write one chrono program: time block first, then its setpoint
    pub async fn set_chrono_program(
        &self,
        number: u8,
        start_hour: u8,
        start_minute: u8,
        stop_hour: u8,
        stop_minute: u8,
        setpoint: f32,
    ) -> Result<bool> {
        let program = ChronoProgram::new(
            number,
            start_hour,
            start_minute,
            stop_hour,
            stop_minute,
            setpoint,
        )
        .map_err(invalid)?;
        self.validate_setpoint(setpoint)?;
        let bytes = encode_chrono_program(&program).map_err(invalid)?;
        let time_address = program_address(number).map_err(invalid)?;
        let setpoint_address = program_setpoint_address(number).map_err(invalid)?;

        if !self.ready_for_chrono_write("program") {
            return Ok(false);
        }
        let _permit = self.gate.acquire(OP_CHRONO_WRITE).await;

        if let Err(e) = self.link.send_write(time_address, &bytes.times).await {
            error!(program = number, error = %e, "Chrono program time write failed");
            return Ok(false);
        }
        if let Err(e) = self.link.send_write(setpoint_address, &[bytes.setpoint]).await {
            error!(program = number, error = %e, "Chrono program setpoint write failed");
            return Ok(false);
        }

        info!(
            program = number,
            "Chrono program set to {:02}:{:02}-{:02}:{:02} at {:.1} °C",
            start_hour,
            start_minute,
            stop_hour,
            stop_minute,
            setpoint
        );
        let mut state = self.state.write();
        if let Some(slot) = state
            .chrono_programs
            .iter_mut()
            .find(|p| p.number == number)
        {
            *slot = program;
        }
        Ok(true)
    }

    /// Assign up to three programs to a weekday (0 = none)
    pub async fn set_chrono_day(&self, day: u8, slot_1: u8, slot_2: u8, slot_3: u8) -> Result<bool> {
        let bytes = encode_chrono_day(day, slot_1, slot_2, slot_3).map_err(invalid)?;
        let address = day_address(day).map_err(invalid)?;

        if !self.ready_for_chrono_write("day") {
            return Ok(false);
        }
        let _permit = self.gate.acquire(OP_CHRONO_WRITE).await;

        if let Err(e) = self.link.send_write(address, &bytes).await {
            error!(day, error = %e, "Chrono day write failed");
            return Ok(false);
        }

        info!(day, slots = ?bytes, "Chrono day written");
        let mut state = self.state.write();
        if let Some(entry) = state.chrono_days.iter_mut().find(|d| d.day_number == day) {
            entry.memory_slot_1 = slot_1;
            entry.memory_slot_2 = slot_2;
            entry.memory_slot_3 = slot_3;
        }
        Ok(true)
    }

    /// Enable or disable the chrono timer, leaving other status bits alone
    pub async fn set_chrono_status(&self, enabled: bool) -> bool {
        if !self.ready_for_chrono_write("status") {
            return false;
        }
        let _permit = self.gate.acquire(OP_CHRONO_WRITE).await;

        let current = match self.read_register(REGISTER_CHRONO_STATUS, parse_byte).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Chrono status read failed");
                return false;
            },
        };
        let updated = set_enable_bit(current, enabled);
        if let Err(e) = self.link.send_write(REGISTER_CHRONO_STATUS, &[updated]).await {
            error!(enabled, error = %e, "Chrono status write failed");
            return false;
        }

        info!(enabled, "Chrono timer {}", if enabled { "enabled" } else { "disabled" });
        self.state.write().timer_enabled = enabled;
        true
    }

    fn ready_for_chrono_write(&self, what: &str) -> bool {
        if self.state.read().connected {
            return true;
        }
        warn!("Chrono {what} not written, stove not connected");
        false
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::core::transport::{MockStoveHandle, MockTransport, MockTransportConfig};
    use crate::protocols::palazzetti::{ExchangeBudget, ExchangePolicy};

    fn quick_policy() -> ExchangePolicy {
        ExchangePolicy {
            read: ExchangeBudget::new(2, Duration::from_millis(40), Duration::from_millis(25)),
            write: ExchangeBudget::new(2, Duration::from_millis(40), Duration::from_millis(25)),
            probe_timeout: Duration::from_millis(40),
        }
    }

    async fn connected() -> (DeviceController, MockStoveHandle) {
        let controller =
            DeviceController::new(LinkTransport::new(quick_policy()), ControllerConfig::default());
        let transport =
            MockTransport::new(MockTransportConfig::with_heartbeat(Duration::from_millis(4)));
        let stove = transport.handle();
        assert!(
            controller
                .connect_with(Box::new(transport), Duration::from_millis(100))
                .await
        );
        (controller, stove)
    }

    #[tokio::test]
    async fn test_refresh_decodes_registers() {
        let (controller, stove) = connected().await;
        stove.set_register(REGISTER_STATUS, &[6]);

        let state = controller.get_state().await;
        assert!(state.connected);
        assert!(state.synchronized);
        assert_eq!(state.status, StoveStatus::Burning);
        assert_eq!(state.status_name, "BURNING");
        assert!(state.power);
        assert_eq!(state.temperature, 21.0);
        assert_eq!(state.setpoint, 22.0);
        assert!(state.setpoint_confirmed);
        assert_eq!(state.power_level, 3);
        assert_eq!(state.error_message, "No error");
        assert!(state.last_refresh.is_some());
    }

    #[tokio::test]
    async fn test_error_status_skips_error_register() {
        let (controller, stove) = connected().await;
        stove.set_register(REGISTER_STATUS, &[253]);

        let state = controller.force_state_refresh().await;
        assert_eq!(state.status, StoveStatus::NoPellets);
        assert_eq!(state.error_code, 253);
        assert_eq!(state.error_message, "NO PELLET ALARM");
        assert!(!stove.read_addresses().contains(&REGISTER_ERROR_CODE));
    }

    #[tokio::test]
    async fn test_error_register_is_a_word() {
        let (controller, stove) = connected().await;
        stove.set_register(REGISTER_ERROR_CODE, &[0x01, 0x01]);

        let state = controller.force_state_refresh().await;
        assert_eq!(state.error_code, 0x101);
        assert_eq!(state.error_message, "E101: Ignition failed (pellets or brazier)");

        stove.set_register(REGISTER_ERROR_CODE, &[0x00, 0x00]);
        let state = controller.force_state_refresh().await;
        assert_eq!(state.error_code, 0);
        assert_eq!(state.error_message, "No error");
    }

    #[tokio::test]
    async fn test_failed_reads_keep_previous_values() {
        let (controller, stove) = connected().await;
        let first = controller.force_state_refresh().await;
        assert!(first.synchronized);

        stove.set_register(REGISTER_TEMPERATURE, &[0xE6, 0x00]);
        stove.fail_register(REGISTER_TEMPERATURE);
        stove.fail_register(REGISTER_SETPOINT_8BYTES);

        let second = controller.force_state_refresh().await;
        assert!(second.connected);
        assert!(!second.synchronized);
        assert_eq!(second.temperature, first.temperature);
        assert_eq!(second.setpoint, first.setpoint);
    }

    #[tokio::test]
    async fn test_pellet_consumption() {
        let (controller, stove) = connected().await;
        assert_eq!(controller.get_pellet_consumption().await, Some(1234));

        stove.fail_register(REGISTER_PELLET_CONSUMPTION);
        assert_eq!(controller.get_pellet_consumption().await, None);
    }

    #[tokio::test]
    async fn test_power_commands() {
        let (controller, stove) = connected().await;

        assert!(controller.set_power(true).await);
        let state = controller.snapshot();
        assert!(state.power);
        assert_eq!(state.status, StoveStatus::HeatUp);
        assert_eq!(stove.writes_to(REGISTER_POWER_CONTROL)[0][0], POWER_ON);

        assert!(controller.set_power_level(5).await.unwrap());
        assert_eq!(controller.snapshot().power_level, 5);
        assert!(matches!(
            controller.set_power_level(6).await,
            Err(StoveSrvError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_chrono_roundtrip() {
        let (controller, stove) = connected().await;

        let data = controller.get_chrono_data().await.unwrap();
        assert_eq!(data.programs.len(), 6);
        assert_eq!(data.days.len(), 7);
        assert_eq!(data.programs[0].setpoint, 21.0);
        assert_eq!(data.days[6].day_name, "Sunday");
        assert!(!data.timer_enabled);

        assert!(controller
            .set_chrono_program(3, 12, 0, 14, 30, 20.0)
            .await
            .unwrap());
        assert_eq!(
            stove.writes_to(program_address(3).unwrap())[0][..4],
            [12, 0, 14, 30]
        );
        assert_eq!(
            stove.writes_to(program_setpoint_address(3).unwrap())[0][0],
            100
        );

        assert!(controller.set_chrono_day(6, 3, 0, 0).await.unwrap());
        assert!(controller.set_chrono_status(true).await);

        let reread = controller.get_chrono_data().await.unwrap();
        assert_eq!(reread.programs[2].start_hour, 12);
        assert_eq!(reread.programs[2].setpoint, 20.0);
        assert_eq!(reread.days[5].memory_slot_1, 3);
        assert!(reread.timer_enabled);
        assert_eq!(controller.snapshot().chrono_programs, reread.programs);
    }

    #[tokio::test]
    async fn test_chrono_status_keeps_other_bits() {
        let (controller, stove) = connected().await;
        stove.set_register(REGISTER_CHRONO_STATUS, &[0x80]);

        assert!(controller.set_chrono_status(true).await);
        assert_eq!(stove.writes_to(REGISTER_CHRONO_STATUS)[0][0], 0x81);
        assert!(controller.snapshot().timer_enabled);

        assert!(controller.set_chrono_status(false).await);
        assert_eq!(stove.writes_to(REGISTER_CHRONO_STATUS)[1][0], 0x80);
        assert!(!controller.snapshot().timer_enabled);
    }

    #[tokio::test]
    async fn test_chrono_validation_precedes_io() {
        let (controller, stove) = connected().await;

        assert!(controller
            .set_chrono_program(7, 6, 0, 8, 0, 20.0)
            .await
            .is_err());
        assert!(controller
            .set_chrono_program(1, 6, 60, 8, 0, 20.0)
            .await
            .is_err());
        assert!(controller
            .set_chrono_program(1, 6, 0, 8, 0, 30.0)
            .await
            .is_err());
        assert!(controller.set_chrono_day(0, 1, 0, 0).await.is_err());
        assert!(controller.set_chrono_day(1, 1, 9, 0).await.is_err());
        assert_eq!(stove.write_count(), 0);
    }

    #[tokio::test]
    async fn test_chrono_read_aborts_on_failure() {
        let (controller, stove) = connected().await;
        stove.fail_register(day_address(4).unwrap());
        assert!(controller.get_chrono_data().await.is_none());
        assert!(controller.snapshot().chrono_days.is_empty());
    }

    #[tokio::test]
    async fn test_commands_without_connection() {
        let controller =
            DeviceController::new(LinkTransport::new(quick_policy()), ControllerConfig::default());

        assert!(!controller.set_power(true).await);
        assert!(!controller.set_temperature(21.0).await.unwrap());
        assert!(!controller.set_chrono_status(true).await);
        assert!(!controller.set_chrono_day(1, 1, 0, 0).await.unwrap());
        assert!(controller.get_chrono_data().await.is_none());

        let state = controller.get_state().await;
        assert!(!state.connected);
        assert_eq!(state.error_message, crate::controller::state::LINK_LOST_MESSAGE);
    }
}
