//! Error types for telemetry-gate

use thiserror::Error;

/// Main error type for the telemetry-gate library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Broker/delivery error
    #[error("broker error: {0}")]
    Broker(String),
}

/// Result type alias for telemetry-gate
pub type Result<T> = std::result::Result<T, Error>;
