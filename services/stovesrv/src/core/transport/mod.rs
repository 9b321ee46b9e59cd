//! Transport Layer Module
//!
//! Byte-level access to the stove line, kept apart from protocol logic.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │   LinkTransport (SYNC wait, retry, match)   │
//! └─────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │   Transport trait                           │
//! │   connect(), send(), receive(timeout)       │
//! └─────────────────────────────────────────────┘
//!            │                        │
//!            ▼                        ▼
//!   ┌─────────────────┐     ┌──────────────────┐
//!   │ SerialTransport │     │  MockTransport   │
//!   │  (8N2 serial)   │     │ (simulated stove)│
//!   └─────────────────┘     └──────────────────┘
//! ```

pub mod mock;
pub mod serial;
pub mod traits;

pub use mock::{MockStoveHandle, MockTransport, MockTransportConfig, WireRequest};
pub use serial::{SerialTransport, SerialTransportConfig};
pub use traits::{LinkState, Transport, TransportError, TransportStats};
