//! Error handling for the stove link service
//!
//! Layer errors (`FrameError`, `RegisterError`, `TransportError`,
//! `ExchangeError`) stay typed inside their modules; they fold into
//! [`StoveSrvError`] when they cross into service-level code, and into
//! `errors::ServiceError` at the binary boundary.

use errors::{ErrorCategory, ServiceError, ServiceErrorTrait};
use thiserror::Error;

use crate::core::transport::TransportError;
use crate::protocols::palazzetti::{ExchangeError, FrameError, RegisterError};

/// Stove service error type
#[derive(Error, Debug, Clone)]
pub enum StoveSrvError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input/Output operation errors
    #[error("IO error: {0}")]
    IoError(String),

    /// Frame or register decoding errors
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Link establishment and liveness errors
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Exchange budget exhausted
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// Command argument rejected before any I/O
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type alias for the stove service
pub type Result<T> = std::result::Result<T, StoveSrvError>;

impl StoveSrvError {
    pub fn config(msg: impl Into<String>) -> Self {
        StoveSrvError::ConfigError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        StoveSrvError::ValidationError(msg.into())
    }

    pub fn not_connected() -> Self {
        StoveSrvError::ConnectionError("Not connected".to_string())
    }
}

// ============================================================================
// From implementations for layer and external error types
// ============================================================================

impl From<std::io::Error> for StoveSrvError {
    fn from(err: std::io::Error) -> Self {
        StoveSrvError::IoError(err.to_string())
    }
}

impl From<serde_yaml::Error> for StoveSrvError {
    fn from(err: serde_yaml::Error) -> Self {
        StoveSrvError::ConfigError(format!("YAML: {err}"))
    }
}

impl From<serde_json::Error> for StoveSrvError {
    fn from(err: serde_json::Error) -> Self {
        StoveSrvError::InternalError(format!("JSON: {err}"))
    }
}

impl From<figment::Error> for StoveSrvError {
    fn from(err: figment::Error) -> Self {
        StoveSrvError::ConfigError(format!("Failed to parse config: {err}"))
    }
}

impl From<TransportError> for StoveSrvError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConfigError(msg) => StoveSrvError::ConfigError(msg),
            TransportError::Timeout(msg) => StoveSrvError::TimeoutError(msg),
            TransportError::IoError(msg) => StoveSrvError::IoError(msg),
            other => StoveSrvError::ConnectionError(other.to_string()),
        }
    }
}

impl From<FrameError> for StoveSrvError {
    fn from(err: FrameError) -> Self {
        StoveSrvError::ProtocolError(err.to_string())
    }
}

impl From<RegisterError> for StoveSrvError {
    fn from(err: RegisterError) -> Self {
        StoveSrvError::ProtocolError(err.to_string())
    }
}

impl From<ExchangeError> for StoveSrvError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::LinkUnavailable => StoveSrvError::not_connected(),
            ExchangeError::Exhausted { .. } => StoveSrvError::TimeoutError(err.to_string()),
            ExchangeError::Frame(e) => StoveSrvError::ProtocolError(e.to_string()),
        }
    }
}

// ============================================================================
// Conversion to ServiceError at the binary boundary
// ============================================================================

impl From<StoveSrvError> for ServiceError {
    fn from(err: StoveSrvError) -> Self {
        match err {
            StoveSrvError::ConfigError(msg) => ServiceError::Configuration(msg),
            StoveSrvError::IoError(msg) => ServiceError::Io(std::io::Error::other(msg)),
            StoveSrvError::ProtocolError(msg) => ServiceError::Protocol {
                protocol: "palazzetti".to_string(),
                message: msg,
            },
            StoveSrvError::ConnectionError(msg) => ServiceError::Communication(msg),
            StoveSrvError::TimeoutError(msg) => ServiceError::Timeout(msg),
            StoveSrvError::ValidationError(msg) => ServiceError::Validation(msg),
            StoveSrvError::InternalError(msg) => ServiceError::Internal(msg),
        }
    }
}

impl ServiceErrorTrait for StoveSrvError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "STOVESRV_CONFIG_ERROR",
            Self::IoError(_) => "STOVESRV_IO_ERROR",
            Self::ProtocolError(_) => "STOVESRV_PROTOCOL_ERROR",
            Self::ConnectionError(_) => "STOVESRV_CONNECTION_ERROR",
            Self::TimeoutError(_) => "STOVESRV_TIMEOUT",
            Self::ValidationError(_) => "STOVESRV_VALIDATION_ERROR",
            Self::InternalError(_) => "STOVESRV_INTERNAL_ERROR",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError(_) => ErrorCategory::Configuration,
            Self::IoError(_) => ErrorCategory::Internal,
            Self::ProtocolError(_) => ErrorCategory::Protocol,
            Self::ConnectionError(_) => ErrorCategory::Connection,
            Self::TimeoutError(_) => ErrorCategory::Timeout,
            Self::ValidationError(_) => ErrorCategory::Validation,
            Self::InternalError(_) => ErrorCategory::Internal,
        }
    }
}
