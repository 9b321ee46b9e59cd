//! Shared building blocks for the stove services
//!
//! - logging setup (console + daily rolling file)
//! - startup banner and environment bootstrap
//! - graceful shutdown signals
//! - CLI > env > file setting resolution
//! - hex formatting for wire dumps

pub mod config_loader;
pub mod hex;
pub mod logging;
pub mod service_bootstrap;
pub mod shutdown;

// Re-export common dependencies
pub use anyhow;
pub use tokio;
