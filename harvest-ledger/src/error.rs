//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger file unreadable or unwritable
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt or truncated ledger line
    #[error("Parse error on ledger line {line}: {reason}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Invalid configuration (multiplier, scale, addresses)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Address that is neither valid base32 nor valid hex
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress {
        /// Address as supplied
        address: String,
        /// Reason
        reason: String,
    },

    /// Statement lacks the receipts needed to price it
    #[error("Invalid statement at height {height}: {reason}")]
    InvalidStatement {
        /// Block height of the statement
        height: u64,
        /// Reason
        reason: String,
    },

    /// Append would break strictly increasing heights
    #[error("Non-monotonic append: height {height} is not above last height {last}")]
    NonMonotonic {
        /// Height of the rejected record
        height: u64,
        /// Last height already in the ledger
        last: u64,
    },

    /// Another process holds the ledger lock
    #[error("Ledger already in use ({0})")]
    Locked(String),

    /// Record serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a parse error for a given line
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        Error::Parse {
            line,
            reason: reason.into(),
        }
    }
}
