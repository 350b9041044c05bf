//! Error types for the output engine
use thiserror::Error;

/// Output engine errors
///
/// Only setup paths and individual packet sends are fallible. Channel
/// mutations never return errors.
#[derive(Error, Debug)]
pub enum ControlError {
    /// DMX transport error
    #[error("DMX error: {0}")]
    DmxError(String),

    /// The Art-Net destination could not be parsed
    #[error("Invalid Art-Net destination {address:?}: {reason}")]
    InvalidAddress {
        /// The rejected address
        address: String,
        /// Parser message
        reason: String,
    },

    /// `start` was called while the scheduler is running
    #[error("Output engine is already running")]
    AlreadyRunning,

    /// `start` was called outside a tokio runtime
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] lumen_core::CoreError),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
