//! Palazzetti pellet stove serial protocol
//!
//! - [`frame`]: 11-byte frames, checksums, stream resynchronization
//! - [`registers`]: register payload decoding and encoding
//! - [`link`]: heartbeat-synchronized exchanges over a [`Transport`]
//!
//! [`Transport`]: crate::core::transport::Transport

pub mod constants;
pub mod frame;
pub mod link;
pub mod registers;

pub use frame::{construct_read, construct_write, Frame, FrameError, FrameReader, RegisterAddress};
pub use link::{
    AttemptFailure, ExchangeBudget, ExchangeError, ExchangePolicy, LinkStats, LinkTransport,
};
pub use registers::{
    ChronoDay, ChronoProgram, RegisterError, SetpointReading, StatusReading, StoveStatus,
};
