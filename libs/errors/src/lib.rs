//! Unified error handling for Unigate services
//!
//! Every workspace member reports failures through `GatewayError` so that the
//! orchestration layer can apply one propagation policy: transport, handler and
//! per-cycle failures degrade the result, configuration failures abort startup.

use thiserror::Error;

/// Main error type for all Unigate services
#[derive(Debug, Error)]
pub enum GatewayError {
    // ======================================
    // Configuration Errors (fatal at startup)
    // ======================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // ======================================
    // Transport & Protocol Errors
    // ======================================
    #[error("Transport error: {protocol}: {message}")]
    Transport { protocol: String, message: String },

    #[error("Protocol not connected: {0}")]
    NotConnected(String),

    #[error("Connection failed: {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    // ======================================
    // Codec Errors
    // ======================================
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    // ======================================
    // Dispatch & Handler Errors
    // ======================================
    #[error("Handler error: {handler}: {message}")]
    Handler { handler: String, message: String },

    // ======================================
    // Storage & Analytics Errors
    // ======================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ======================================
    // Service & Runtime Errors
    // ======================================
    #[error("Service startup failed: {0}")]
    StartupFailed(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GatewayError
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Transport failure for a named protocol
    pub fn transport(protocol: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            protocol: protocol.into(),
            message: message.to_string(),
        }
    }

    /// Handler failure, isolated by the router
    pub fn handler(handler: impl Into<String>, message: impl ToString) -> Self {
        Self::Handler {
            handler: handler.into(),
            message: message.to_string(),
        }
    }

    /// Errors that only degrade data quality for one operation or cycle.
    /// The process must keep running when these occur.
    pub fn is_degradation(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::NotConnected(_)
                | Self::ConnectionFailed { .. }
                | Self::Decode(_)
                | Self::Encode(_)
                | Self::Handler { .. }
        )
    }

    /// Errors that abort initialization
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::InvalidConfig { .. }
                | Self::MissingConfig(_)
                | Self::StartupFailed(_)
        )
    }
}

// Conversion traits for common error types
impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
