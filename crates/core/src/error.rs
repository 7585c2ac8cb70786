//! Core error types

use thiserror::Error;

/// Core error type for Dactylos
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration is present but not usable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
