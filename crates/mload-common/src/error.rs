//! Error types shared across mload crates

use thiserror::Error;

/// Result type alias for mload operations
pub type Result<T> = std::result::Result<T, MloadError>;

/// Errors that are not specific to a single pipeline stage
#[derive(Error, Debug)]
pub enum MloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

impl MloadError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
