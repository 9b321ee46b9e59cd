//! Wire constants and register map

use super::frame::RegisterAddress;

// ============================================================================
// Frame layout
// ============================================================================

/// Total frame size on the wire
pub const FRAME_SIZE: usize = 11;

/// Payload bytes between id and checksum
pub const PAYLOAD_SIZE: usize = 9;

/// Payload bytes left for a value after the 2-byte address
pub const MAX_VALUE_SIZE: usize = PAYLOAD_SIZE - 2;

/// Heartbeat frame id, emitted unsolicited by the stove
pub const SYNC_ID: u8 = 0x00;

/// Write request id (echoed back by the stove)
pub const WRITE_ID: u8 = 0x01;

/// Read request id (echoed back by the stove)
pub const READ_ID: u8 = 0x02;

/// Line speed; framing is always 8N2
pub const DEFAULT_BAUD_RATE: u32 = 38_400;

// ============================================================================
// Register map
// ============================================================================

pub const REGISTER_STATUS: RegisterAddress = RegisterAddress::new(0x201C);
pub const REGISTER_TEMPERATURE: RegisterAddress = RegisterAddress::new(0x200E);
pub const REGISTER_SETPOINT: RegisterAddress = RegisterAddress::new(0x200F);
pub const REGISTER_SETPOINT_8BYTES: RegisterAddress = RegisterAddress::new(0x1C32);
pub const REGISTER_SETPOINT_2BYTES: RegisterAddress = RegisterAddress::new(0x1C54);
pub const REGISTER_POWER_CONTROL: RegisterAddress = RegisterAddress::new(0x201D);
pub const REGISTER_POWER_LEVEL: RegisterAddress = RegisterAddress::new(0x202A);
pub const REGISTER_ERROR_CODE: RegisterAddress = RegisterAddress::new(0x201E);
pub const REGISTER_ALARM_STATUS: RegisterAddress = RegisterAddress::new(0x201F);
pub const REGISTER_TIMER_SETTINGS: RegisterAddress = RegisterAddress::new(0x2072);
pub const REGISTER_PELLET_CONSUMPTION: RegisterAddress = RegisterAddress::new(0x2002);
pub const REGISTER_CHRONO_SETPOINTS: RegisterAddress = RegisterAddress::new(0x802D);
pub const REGISTER_CHRONO_PROGRAMS: RegisterAddress = RegisterAddress::new(0x8000);
pub const REGISTER_CHRONO_DAYS: RegisterAddress = RegisterAddress::new(0x8018);
pub const REGISTER_CHRONO_STATUS: RegisterAddress = RegisterAddress::new(0x207E);

// ============================================================================
// Register values
// ============================================================================

pub const POWER_OFF: u8 = 0x00;
pub const POWER_ON: u8 = 0x01;

pub const MIN_POWER_LEVEL: u8 = 1;
pub const MAX_POWER_LEVEL: u8 = 5;

/// Fluid type of a pellet stove (8-byte setpoint layout, scaled)
pub const FLUID_PELLET: u8 = 0;

/// Chrono table sizes
pub const CHRONO_PROGRAM_COUNT: u8 = 6;
pub const CHRONO_DAY_COUNT: u8 = 7;
pub const CHRONO_PROGRAM_SIZE: u16 = 4;
pub const CHRONO_DAY_SIZE: u16 = 3;

/// Chrono enable flag in the chrono status byte
pub const CHRONO_ENABLE_BIT: u8 = 0x01;

/// Status codes reserved for error conditions
pub const STATUS_ERROR_RANGE: std::ops::RangeInclusive<u8> = 241..=254;

/// Status code reported when the hopper is empty
pub const STATUS_NO_PELLETS: u8 = 253;
