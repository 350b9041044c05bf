//! Error types for the core channel model
use thiserror::Error;

/// Core errors
///
/// Channel mutations never fail; these only cover configuration.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A configuration value could not be parsed
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidConfig {
        /// Setting or environment variable name
        key: String,
        /// The raw value that was rejected
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A parsed configuration failed validation
    #[error("Configuration error: {0}")]
    Validation(String),

    /// TOML configuration file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
