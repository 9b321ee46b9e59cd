//! Stove Link Service Library (stovesrv)
//!
//! Talks to a pellet stove's control board over its 38400-baud 8N2 serial
//! link and exposes a cached, race-free view of the stove plus typed
//! commands.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │ DeviceController │──►│  LinkTransport   │──►│    Transport     │
//! │ (cache, gate)    │   │ (sync + retries) │   │ (serial / mock)  │
//! └──────────────────┘   └──────────────────┘   └──────────────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌──────────────────┐   ┌──────────────────┐
//! │  runtime monitor │   │ frame / register │
//! │  (watch channel) │   │     codecs       │
//! └──────────────────┘   └──────────────────┘
//! ```
//!
//! - **`protocols::palazzetti`**: 11-byte frame codec, register codecs, link exchange
//! - **`core`**: configuration, bootstrap, physical transports
//! - **`controller`**: device state cache and command API
//! - **`runtime`**: background tasks

pub mod controller;
pub mod core;
pub mod error;
pub mod protocols;
pub mod runtime;

pub use controller::{ChronoData, DeviceController, DeviceState};
pub use error::{Result, StoveSrvError};
pub use protocols::palazzetti::{ExchangePolicy, LinkTransport};
