//! Harvest Ledger Core
//!
//! Append-only ledger of harvested blocks and the pure domain logic that
//! decides who harvested a block and what is owed for it.
//!
//! # Architecture
//!
//! - **Address**: canonical base32 form shared by config and API data
//! - **Classifier**: operator vs. third-party harvester by set membership
//! - **Reward**: receipt selection by type and exact kickback arithmetic
//! - **Storage**: line-oriented, fsync-per-append file with an advisory lock
//!
//! # Invariants
//!
//! - Append-only: heights and amounts are never rewritten
//! - Strictly increasing heights: the resume cursor is always the last line
//! - Operator records never carry a kickback

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod address;
pub mod classifier;
pub mod config;
pub mod error;
pub mod format;
pub mod reward;
pub mod storage;
pub mod types;

// Re-exports
pub use address::Address;
pub use classifier::AddressClassifier;
pub use config::{LedgerConfig, LedgerFormat};
pub use error::{Error, Result};
pub use reward::{RewardCalculator, RewardPolicy, RewardSplit};
pub use storage::{LedgerSnapshot, LedgerStore};
pub use types::{
    HarvestRecord, HarvestStatement, HarvesterClass, PaymentStatus, ReceiptEntry,
    HARVEST_FEE_RECEIPT_TYPE,
};
