//! Error types for the rate limit guards.

use thiserror::Error;

/// Main error type for guard construction and configuration.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A guard was asked to key on a header name that is not valid HTTP
    #[error("Invalid header name {name:?}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: axum::http::header::InvalidHeaderName,
    },

    /// The header value pattern failed to compile
    #[error("Invalid header value pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;
