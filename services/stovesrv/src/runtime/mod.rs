//! Runtime tasks

pub mod monitor;

pub use monitor::start_monitor;
