//! Error types for Mender.
//!
//! Errors are split by the service they come from. Library errors carry the
//! HTTP status so the orchestration loop can tell a skippable item from a
//! broken server; LLM errors never leave the rewriter.

use thiserror::Error;

/// Top-level error type for Mender operations.
#[derive(Error, Debug)]
pub enum MenderError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Media library errors
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse JSON configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors talking to the media library server.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// The server answered with a non-success status
    #[error("{method} {path} returned HTTP {status}: {message}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        message: String,
    },

    /// The request never produced a response (DNS, connect, timeout)
    #[error("{method} {path} failed: {message}")]
    Transport {
        method: &'static str,
        path: String,
        message: String,
    },

    /// The response body could not be decoded
    #[error("Unexpected response from {path}: {message}")]
    Decode { path: String, message: String },
}

/// Statuses that mean "this item is gone or off limits", not "the server is broken".
pub const RECOVERABLE_STATUSES: [u16; 3] = [403, 404, 410];

impl LibraryError {
    /// Whether the failure only affects the current item.
    pub fn is_recoverable(&self) -> bool {
        match self {
            LibraryError::Status { status, .. } => RECOVERABLE_STATUSES.contains(status),
            _ => false,
        }
    }
}

/// Text generation failure. Always handled per item.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct LlmError {
    pub message: String,
}

impl LlmError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Mender results.
pub type Result<T> = std::result::Result<T, MenderError>;
