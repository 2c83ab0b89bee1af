//! Error types for the reconciler

use thiserror::Error;

/// Result type for reconciler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger file, format or policy error
    #[error("Ledger error: {0}")]
    Ledger(#[from] harvest_ledger::Error),

    /// Node communication error
    #[error("Node error: {0}")]
    Adapter(#[from] symbol_adapter::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Sync interrupted between appends
    #[error("Sync cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl Error {
    /// Whether this error came from cancellation at any layer
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Error::Cancelled | Error::Adapter(symbol_adapter::Error::Cancelled)
        )
    }
}
