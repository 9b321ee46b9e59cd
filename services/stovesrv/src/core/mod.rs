//! Service core: configuration, bootstrap and physical transports

pub mod bootstrap;
pub mod config;
pub mod transport;
