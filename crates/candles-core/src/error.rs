//! Error taxonomy for the candles service.
//!
//! Validation and Storage surface synchronously to callers; Resolution and
//! Transport are always non-fatal and end up as logged skip outcomes.

use thiserror::Error;

/// Unified error type across the workspace.
#[derive(Debug, Error)]
pub enum CandlesError {
    /// Malformed input to a write or query operation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Persistence layer failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Destination or user could not be resolved by the host platform.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// Outbound send failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration file problem.
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CandlesError>;
