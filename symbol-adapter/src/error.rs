//! Error types for the node adapter

use thiserror::Error;

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Adapter errors
#[derive(Error, Debug)]
pub enum Error {
    /// Connection or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Timeout
    #[error("Timeout after {seconds}s: {operation}")]
    Timeout {
        /// Timeout duration
        seconds: u64,
        /// Operation
        operation: String,
    },

    /// Node answered with a non-success status
    #[error("Node API error {status_code}: {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },

    /// Malformed JSON or missing expected field
    #[error("Decode error: {0}")]
    Decode(String),

    /// Retry exhausted
    #[error("Retry exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted {
        /// Attempts
        attempts: u32,
        /// Last error
        last_error: String,
    },

    /// Operation interrupted by cancellation
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the failure may go away on its own
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Timeout { .. } => true,
            Error::Api { status_code, .. } => *status_code == 429 || *status_code >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<harvest_ledger::Error> for Error {
    fn from(err: harvest_ledger::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
