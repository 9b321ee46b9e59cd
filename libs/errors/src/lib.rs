//! Unified error handling for stove services
//!
//! Service crates keep their own domain error types (e.g. `StoveSrvError`) and
//! convert into [`ServiceError`] at the binary boundary, where a single result
//! type is returned from `main`.

use thiserror::Error;

/// Error surfaced by a service binary
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Device link could not be established
    #[error("Connection failed: {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Protocol error: {protocol}: {message}")]
    Protocol { protocol: String, message: String },

    #[error("Timeout waiting for response from {0}")]
    Timeout(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource busy: {0}")]
    ResourceBusy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ServiceError
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn connection_failed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Process exit status (sysexits.h)
    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::Configuration => 78, // EX_CONFIG
            ErrorCategory::Connection | ErrorCategory::Timeout => 69, // EX_UNAVAILABLE
            ErrorCategory::Protocol => 76, // EX_PROTOCOL
            ErrorCategory::Validation => 65, // EX_DATAERR
            ErrorCategory::ResourceBusy => 75, // EX_TEMPFAIL
            ErrorCategory::Internal => 70, // EX_SOFTWARE
        }
    }
}

impl From<serde_yaml::Error> for ServiceError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Configuration(format!("YAML: {err}"))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON: {err}"))
    }
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::ServiceError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::ServiceError::Configuration(format!($fmt, $($arg)*))
    };
}

// ============================================================================
// Error classification
// ============================================================================

/// Coarse error classes shared by every service error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Connection,
    Timeout,
    Protocol,
    Validation,
    ResourceBusy,
    Internal,
}

/// Classification interface implemented by each service's error enum
pub trait ServiceErrorTrait: std::error::Error + Send + Sync + 'static {
    /// Stable identifier for logs
    fn error_code(&self) -> &'static str;

    fn category(&self) -> ErrorCategory;

    /// Link-level trouble may clear up on its own
    fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Connection | ErrorCategory::Timeout | ErrorCategory::ResourceBusy
        )
    }

    fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self.category() {
            ErrorCategory::Internal | ErrorCategory::Configuration => Level::ERROR,
            ErrorCategory::Validation => Level::INFO,
            _ => Level::WARN,
        }
    }
}

impl ServiceErrorTrait for ServiceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::ConnectionFailed { .. } => "CONNECTION_FAILED",
            Self::Communication(_) => "COMMUNICATION_ERROR",
            Self::Protocol { .. } => "PROTOCOL_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ResourceBusy(_) => "RESOURCE_BUSY",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Other(_) => "OTHER_ERROR",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::ConnectionFailed { .. } | Self::Communication(_) => ErrorCategory::Connection,
            Self::Protocol { .. } => ErrorCategory::Protocol,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::ResourceBusy(_) => ErrorCategory::ResourceBusy,
            Self::Io(_) | Self::Internal(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }
}
