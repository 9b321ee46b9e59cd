//! Device state snapshot and refresh bookkeeping

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocols::palazzetti::{ChronoDay, ChronoProgram, ExchangeError, RegisterError, StoveStatus};

/// Message reported while the liveness probe fails
pub const LINK_LOST_MESSAGE: &str = "Serial link lost - check the cable";

/// Authoritative view of the stove
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub connected: bool,
    /// Last refresh reached quorum
    pub synchronized: bool,
    pub status: StoveStatus,
    pub status_code: u8,
    pub status_name: String,
    pub power: bool,
    /// Room temperature (°C)
    pub temperature: f32,
    /// Target temperature (°C)
    pub setpoint: f32,
    /// False while `setpoint` holds an unconfirmed local value
    pub setpoint_confirmed: bool,
    pub seco: f32,
    pub beco: bool,
    pub power_level: u8,
    pub error_code: u16,
    pub error_message: String,
    pub alarm_status: u8,
    pub timer_enabled: bool,
    pub chrono_programs: Vec<ChronoProgram>,
    pub chrono_days: Vec<ChronoDay>,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl DeviceState {
    /// Placeholder state before the first refresh
    pub fn new(default_temperature: f32) -> Self {
        Self {
            connected: false,
            synchronized: false,
            status: StoveStatus::Off,
            status_code: 0,
            status_name: "OFF".to_string(),
            power: false,
            temperature: default_temperature,
            setpoint: default_temperature,
            setpoint_confirmed: false,
            seco: 0.0,
            beco: false,
            power_level: 1,
            error_code: 0,
            error_message: String::new(),
            alarm_status: 0,
            timer_enabled: false,
            chrono_programs: Vec::new(),
            chrono_days: Vec::new(),
            last_refresh: None,
        }
    }

    pub fn mark_link_lost(&mut self) {
        self.connected = false;
        self.synchronized = false;
        self.error_message = LINK_LOST_MESSAGE.to_string();
    }
}

/// Chrono tables as read from the stove
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChronoData {
    pub programs: Vec<ChronoProgram>,
    pub days: Vec<ChronoDay>,
    pub timer_enabled: bool,
}

/// Why one register read produced no value
#[derive(Debug, Clone, PartialEq)]
pub enum ReadFailure {
    /// Exchange did not complete
    Link(ExchangeError),
    /// Response did not decode
    Decode(RegisterError),
}

impl std::fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadFailure::Link(e) => write!(f, "{e}"),
            ReadFailure::Decode(e) => write!(f, "{e}"),
        }
    }
}

/// Outcome of one register read during a refresh
pub type RegisterRead<T> = Result<T, ReadFailure>;

/// Primary reads that decide synchronization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub status_ok: bool,
    pub temperature_ok: bool,
    pub setpoint_ok: bool,
}

impl RefreshOutcome {
    /// Minimum number of primary reads for a synchronized refresh
    pub const QUORUM: usize = 2;

    pub fn succeeded(&self) -> usize {
        [self.status_ok, self.temperature_ok, self.setpoint_ok]
            .iter()
            .filter(|ok| **ok)
            .count()
    }

    pub fn meets_quorum(&self) -> bool {
        self.succeeded() >= Self::QUORUM
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_quorum() {
        let mut outcome = RefreshOutcome::default();
        assert!(!outcome.meets_quorum());

        outcome.status_ok = true;
        assert!(!outcome.meets_quorum());

        outcome.setpoint_ok = true;
        assert!(outcome.meets_quorum());
        assert_eq!(outcome.succeeded(), 2);
    }

    #[test]
    fn test_placeholder_state() {
        let state = DeviceState::new(22.0);
        assert!(!state.connected);
        assert!(!state.synchronized);
        assert_eq!(state.setpoint, 22.0);
        assert_eq!(state.temperature, 22.0);
        assert!(state.last_refresh.is_none());
    }

    #[test]
    fn test_mark_link_lost() {
        let mut state = DeviceState::new(22.0);
        state.connected = true;
        state.synchronized = true;
        state.mark_link_lost();
        assert!(!state.connected);
        assert!(!state.synchronized);
        assert_eq!(state.error_message, LINK_LOST_MESSAGE);
    }

    #[test]
    fn test_state_serializes() {
        let json = serde_json::to_value(DeviceState::new(21.0)).unwrap();
        assert_eq!(json["status"], "OFF");
        assert_eq!(json["setpoint"], 21.0);
    }
}
