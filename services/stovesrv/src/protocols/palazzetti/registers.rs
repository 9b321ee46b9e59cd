//! Register codec
//!
//! Pure translation between response payload bytes and typed values. The
//! stove answers a read with the register value starting at payload offset 0.

use serde::Serialize;
use thiserror::Error;

use super::constants::{
    CHRONO_DAY_COUNT, CHRONO_DAY_SIZE, CHRONO_ENABLE_BIT, CHRONO_PROGRAM_COUNT,
    CHRONO_PROGRAM_SIZE, MAX_POWER_LEVEL, MIN_POWER_LEVEL, REGISTER_CHRONO_DAYS,
    REGISTER_CHRONO_PROGRAMS, REGISTER_CHRONO_SETPOINTS, STATUS_ERROR_RANGE, STATUS_NO_PELLETS,
};
use super::frame::RegisterAddress;

/// Register decode/encode errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegisterError {
    #[error("Payload too short: need {needed} bytes, got {got}")]
    PayloadTooShort { needed: usize, got: usize },

    #[error("Unsupported fluid type: {0}")]
    UnsupportedFluidType(u8),

    #[error("Value {value} cannot be encoded for fluid type {fluid_type}")]
    ValueOutOfRange { value: f32, fluid_type: u8 },

    #[error("Invalid power level: {0} (expected {MIN_POWER_LEVEL}-{MAX_POWER_LEVEL})")]
    InvalidPowerLevel(u8),

    #[error("Invalid chrono program number: {0} (expected 1-{CHRONO_PROGRAM_COUNT})")]
    InvalidProgram(u8),

    #[error("Invalid chrono day number: {0} (expected 1-{CHRONO_DAY_COUNT})")]
    InvalidDay(u8),

    #[error("Invalid time: {hour:02}:{minute:02}")]
    InvalidTime { hour: u8, minute: u8 },

    #[error("Invalid memory slot: {0} (expected 0-{CHRONO_PROGRAM_COUNT})")]
    InvalidMemorySlot(u8),
}

type Result<T> = std::result::Result<T, RegisterError>;

fn require(payload: &[u8], needed: usize) -> Result<()> {
    if payload.len() < needed {
        return Err(RegisterError::PayloadTooShort {
            needed,
            got: payload.len(),
        });
    }
    Ok(())
}

// ============================================================================
// Status
// ============================================================================

/// Status code table: code -> (name, burning)
const STATUS_TABLE: [(&str, bool); 23] = [
    ("OFF", false),            // 0
    ("---", false),            // 1
    ("TEST FIRE", true),       // 2
    ("HEAT UP", true),         // 3
    ("FUEL IGN", true),        // 4
    ("IGN TEST", true),        // 5
    ("BURNING", true),         // 6
    ("---", false),            // 7
    ("---", false),            // 8
    ("COOLING", false),        // 9
    ("FIRE STOP", false),      // 10
    ("CLEAN FIRE", false),     // 11
    ("COOL", false),           // 12
    ("OFF", false),            // 13
    ("HEAT UP", true),         // 14
    ("FIRE UP", true),         // 15
    ("STABILIZATION", true),   // 16
    ("BURNING", true),         // 17
    ("CLEANING", false),       // 18
    ("FINAL CLEANING", false), // 19
    ("STANDBY", false),        // 20
    ("ALARM", false),          // 21
    ("ALARM", false),          // 22
];

/// Decoded status register
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReading {
    pub code: u8,
    pub name: String,
    pub power_on: bool,
}

impl StatusReading {
    /// Status codes 241..=254 carry an error condition
    pub fn is_error(&self) -> bool {
        STATUS_ERROR_RANGE.contains(&self.code)
    }
}

/// Coarse stove status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoveStatus {
    Off,
    TestFire,
    HeatUp,
    Burning,
    Cooling,
    Starting,
    Alarm,
    NoPellets,
    Unknown(u8),
}

impl StoveStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 | 13 | 20 => Self::Off,
            2 => Self::TestFire,
            3 | 14 => Self::HeatUp,
            4 | 5 | 15 | 16 => Self::Starting,
            6 | 17 => Self::Burning,
            9..=12 | 18 | 19 => Self::Cooling,
            21 | 22 => Self::Alarm,
            STATUS_NO_PELLETS => Self::NoPellets,
            c if STATUS_ERROR_RANGE.contains(&c) => Self::Alarm,
            c => Self::Unknown(c),
        }
    }
}

pub fn parse_status(payload: &[u8]) -> Result<StatusReading> {
    require(payload, 1)?;
    let code = payload[0];
    let (name, power_on) = match STATUS_TABLE.get(code as usize) {
        Some((name, power_on)) => ((*name).to_string(), *power_on),
        None => (format!("STATUS_{code}"), false),
    };
    Ok(StatusReading {
        code,
        name,
        power_on,
    })
}

// ============================================================================
// Temperatures
// ============================================================================

/// Room temperature: u16 LE in tenths of a degree
pub fn parse_temperature(payload: &[u8]) -> Result<f32> {
    Ok(f32::from(parse_word(payload)?) / 10.0)
}

/// Decoded setpoint register
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SetpointReading {
    pub setpoint: f32,
    pub seco: f32,
    pub beco: bool,
}

/// Setpoint layout depends on the stove's fluid type
///
/// - 0/1: 8-byte layout `[seco, setpoint, _, beco, ...]`, fluid 0 scaled
///   (seco /10, setpoint /5), fluid 1 raw
/// - 2: 2-byte layout, setpoint u16 LE, no seco/beco
pub fn parse_setpoint(payload: &[u8], fluid_type: u8) -> Result<SetpointReading> {
    match fluid_type {
        0 | 1 => {
            require(payload, 8)?;
            let seco_raw = f32::from(payload[0]);
            let setpoint_raw = f32::from(payload[1]);
            let beco = payload[3] > 0;
            let (setpoint, seco) = if fluid_type == 0 {
                (setpoint_raw / 5.0, seco_raw / 10.0)
            } else {
                (setpoint_raw, seco_raw)
            };
            Ok(SetpointReading {
                setpoint,
                seco,
                beco,
            })
        },
        2 => Ok(SetpointReading {
            setpoint: f32::from(parse_word(payload)?),
            seco: 0.0,
            beco: false,
        }),
        other => Err(RegisterError::UnsupportedFluidType(other)),
    }
}

/// Setpoint write bytes: fluid 0 one byte x5, fluid 1 one byte, fluid 2 u16 LE
pub fn encode_setpoint(value: f32, fluid_type: u8) -> Result<Vec<u8>> {
    let out_of_range = || RegisterError::ValueOutOfRange { value, fluid_type };
    if !value.is_finite() {
        return Err(out_of_range());
    }
    match fluid_type {
        0 | 1 => {
            let scaled = if fluid_type == 0 {
                (value * 5.0).round()
            } else {
                value.round()
            };
            if !(0.0..=f32::from(u8::MAX)).contains(&scaled) {
                return Err(out_of_range());
            }
            Ok(vec![scaled as u8])
        },
        2 => {
            let raw = value.round();
            if !(0.0..=f32::from(u16::MAX)).contains(&raw) {
                return Err(out_of_range());
            }
            Ok((raw as u16).to_le_bytes().to_vec())
        },
        other => Err(RegisterError::UnsupportedFluidType(other)),
    }
}

// ============================================================================
// Plain values
// ============================================================================

/// u16 LE at offset 0 (pellet counter, error code)
pub fn parse_word(payload: &[u8]) -> Result<u16> {
    require(payload, 2)?;
    Ok(u16::from_le_bytes([payload[0], payload[1]]))
}

pub fn parse_byte(payload: &[u8]) -> Result<u8> {
    require(payload, 1)?;
    Ok(payload[0])
}

pub fn parse_power_level(payload: &[u8]) -> Result<u8> {
    let level = parse_byte(payload)?;
    validate_power_level(level)?;
    Ok(level)
}

pub fn validate_power_level(level: u8) -> Result<()> {
    if !(MIN_POWER_LEVEL..=MAX_POWER_LEVEL).contains(&level) {
        return Err(RegisterError::InvalidPowerLevel(level));
    }
    Ok(())
}

// ============================================================================
// Chrono
// ============================================================================

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// One chrono time/temperature program
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChronoProgram {
    pub number: u8,
    pub start_hour: u8,
    pub start_minute: u8,
    pub stop_hour: u8,
    pub stop_minute: u8,
    pub setpoint: f32,
}

impl ChronoProgram {
    /// Validated program; setpoint bounds are the controller's concern
    pub fn new(
        number: u8,
        start_hour: u8,
        start_minute: u8,
        stop_hour: u8,
        stop_minute: u8,
        setpoint: f32,
    ) -> Result<Self> {
        validate_program_number(number)?;
        validate_time(start_hour, start_minute)?;
        validate_time(stop_hour, stop_minute)?;
        Ok(Self {
            number,
            start_hour,
            start_minute,
            stop_hour,
            stop_minute,
            setpoint,
        })
    }
}

/// One weekday schedule; memory slots reference programs (0 = none)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChronoDay {
    pub day_number: u8,
    pub day_name: &'static str,
    pub memory_slot_1: u8,
    pub memory_slot_2: u8,
    pub memory_slot_3: u8,
}

/// Encoded program: 4-byte time block plus 1-byte scaled setpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramBytes {
    pub times: [u8; 4],
    pub setpoint: u8,
}

pub fn day_name(day_number: u8) -> Option<&'static str> {
    DAY_NAMES.get(usize::from(day_number).checked_sub(1)?).copied()
}

fn validate_program_number(number: u8) -> Result<()> {
    if !(1..=CHRONO_PROGRAM_COUNT).contains(&number) {
        return Err(RegisterError::InvalidProgram(number));
    }
    Ok(())
}

fn validate_day_number(day: u8) -> Result<()> {
    if !(1..=CHRONO_DAY_COUNT).contains(&day) {
        return Err(RegisterError::InvalidDay(day));
    }
    Ok(())
}

fn validate_time(hour: u8, minute: u8) -> Result<()> {
    if hour > 23 || minute > 59 {
        return Err(RegisterError::InvalidTime { hour, minute });
    }
    Ok(())
}

pub fn program_address(number: u8) -> Result<RegisterAddress> {
    validate_program_number(number)?;
    Ok(REGISTER_CHRONO_PROGRAMS.offset(CHRONO_PROGRAM_SIZE * u16::from(number - 1)))
}

pub fn program_setpoint_address(number: u8) -> Result<RegisterAddress> {
    validate_program_number(number)?;
    Ok(REGISTER_CHRONO_SETPOINTS.offset(u16::from(number - 1)))
}

pub fn day_address(day: u8) -> Result<RegisterAddress> {
    validate_day_number(day)?;
    Ok(REGISTER_CHRONO_DAYS.offset(CHRONO_DAY_SIZE * u16::from(day - 1)))
}

/// Raw setpoint table: one byte per program, value x5 (0 = unset)
pub fn parse_chrono_setpoints(payload: &[u8]) -> Result<[u8; CHRONO_PROGRAM_COUNT as usize]> {
    let count = usize::from(CHRONO_PROGRAM_COUNT);
    require(payload, count)?;
    let mut raw = [0u8; CHRONO_PROGRAM_COUNT as usize];
    raw.copy_from_slice(&payload[..count]);
    Ok(raw)
}

/// Program from its time block and the raw byte of the setpoint table
pub fn parse_chrono_program(number: u8, payload: &[u8], setpoint_raw: u8) -> Result<ChronoProgram> {
    validate_program_number(number)?;
    require(payload, 4)?;
    let setpoint = if setpoint_raw > 0 {
        f32::from(setpoint_raw) / 5.0
    } else {
        0.0
    };
    Ok(ChronoProgram {
        number,
        start_hour: payload[0],
        start_minute: payload[1],
        stop_hour: payload[2],
        stop_minute: payload[3],
        setpoint,
    })
}

pub fn parse_chrono_day(day: u8, payload: &[u8]) -> Result<ChronoDay> {
    validate_day_number(day)?;
    require(payload, 3)?;
    Ok(ChronoDay {
        day_number: day,
        day_name: DAY_NAMES[usize::from(day - 1)],
        memory_slot_1: payload[0],
        memory_slot_2: payload[1],
        memory_slot_3: payload[2],
    })
}

pub fn encode_chrono_program(program: &ChronoProgram) -> Result<ProgramBytes> {
    validate_program_number(program.number)?;
    validate_time(program.start_hour, program.start_minute)?;
    validate_time(program.stop_hour, program.stop_minute)?;
    let setpoint = encode_setpoint(program.setpoint, 0)?;
    Ok(ProgramBytes {
        times: [
            program.start_hour,
            program.start_minute,
            program.stop_hour,
            program.stop_minute,
        ],
        setpoint: setpoint[0],
    })
}

pub fn encode_chrono_day(day: u8, slot_1: u8, slot_2: u8, slot_3: u8) -> Result<[u8; 3]> {
    validate_day_number(day)?;
    for slot in [slot_1, slot_2, slot_3] {
        if slot > CHRONO_PROGRAM_COUNT {
            return Err(RegisterError::InvalidMemorySlot(slot));
        }
    }
    Ok([slot_1, slot_2, slot_3])
}

/// Chrono status byte with bit 0 set or cleared, other bits untouched
pub fn set_enable_bit(current: u8, enabled: bool) -> u8 {
    if enabled {
        current | CHRONO_ENABLE_BIT
    } else {
        current & !CHRONO_ENABLE_BIT
    }
}

pub fn is_chrono_enabled(status: u8) -> bool {
    status & CHRONO_ENABLE_BIT == CHRONO_ENABLE_BIT
}

// ============================================================================
// Error messages
// ============================================================================

/// Message for an error signalled through the status register (241..=254)
pub fn status_error_message(code: u8) -> Option<&'static str> {
    match code {
        241 => Some("CHIMNEY ALARM"),
        243 => Some("GRATE ERROR"),
        244 => Some("NTC2 ALARM"),
        245 => Some("NTC3 ALARM"),
        247 => Some("DOOR ALARM"),
        248 => Some("PRESSURE ALARM"),
        249 => Some("NTC1 ALARM"),
        250 => Some("TC1 ALARM"),
        252 => Some("GAS ALARM"),
        253 => Some("NO PELLET ALARM"),
        _ => None,
    }
}

/// Message for the error code register: status alarms first, then E-codes
pub fn error_message(code: u16) -> String {
    if let Ok(status_code) = u8::try_from(code) {
        if let Some(msg) = status_error_message(status_code) {
            return msg.to_string();
        }
    }
    let known = match code {
        0x000 => "No error",
        0x001 => "E001: Control keyboard faulty",
        0x004 => "E004: Board/keyboard link interrupted",
        0x101 => "E101: Ignition failed (pellets or brazier)",
        0x108 => "E108: Door or hopper open",
        0x109 => "E109: Pressure switch/breaker alarm",
        0x110 => "E110: Air temperature probe fault",
        0x111 => "E111: Flue gas temperature probe fault",
        _ => return format!("Unknown error: {code}"),
    };
    known.to_string()
}
