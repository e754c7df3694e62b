//! Error handling module for SpeedTrim

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Library-level error type for configuration and other failures outside a task
#[derive(Error, Debug)]
pub enum SpeedTrimError {
    /// Configuration file or value rejected
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    /// Domain error surfaced outside a task
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Result type alias for SpeedTrim operations
pub type SpeedTrimResult<T> = std::result::Result<T, SpeedTrimError>;
