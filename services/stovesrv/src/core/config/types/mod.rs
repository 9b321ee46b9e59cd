//! Configuration type definitions

pub mod app;
pub mod controller;
pub mod logging;
pub mod serial;

pub use app::{AppConfig, ServiceConfig};
pub use controller::{ControllerConfig, MonitorConfig};
pub use logging::LoggingConfig;
pub use serial::{LinkConfig, SerialConfig};
