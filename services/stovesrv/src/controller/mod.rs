//! Device controller: cached state, operation admission, command API

pub mod admission;
pub mod device;
pub mod state;

pub use admission::{OperationGate, OperationPermit};
pub use device::DeviceController;
pub use state::{ChronoData, DeviceState, RefreshOutcome, LINK_LOST_MESSAGE};
