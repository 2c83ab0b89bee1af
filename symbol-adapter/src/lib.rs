//! # Symbol Node Adapter
//!
//! Read-only connectivity to a Symbol REST node with:
//! - Exhaustive page-by-page fetching until a short page
//! - Per-request timeout and bounded retry for transient failures
//! - Mapping of REST JSON into transport-neutral ledger types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │   HarvestSource / NodeDirectory (traits)    │
//! └──────────────────────┬──────────────────────┘
//!                        │
//! ┌──────────────────────▼──────────────────────┐
//! │   NodeClient ── PagedFetcher ── PageSource   │
//! └──────────────────────┬──────────────────────┘
//!                        │
//! ┌──────────────────────▼──────────────────────┐
//! │       RetryStrategy + reqwest timeout        │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod client;
pub mod connector;
pub mod error;
pub mod pagination;
pub mod retry;
pub mod types;

pub use client::{NodeClient, NodeConfig};
pub use connector::{HarvestSource, NodeDirectory};
pub use error::{Error, Result};
pub use pagination::{PageSource, PagedFetcher};
pub use retry::{RetryConfig, RetryStrategy};
pub use types::*;

/// Default page size for paged endpoints
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Network currency mosaic id on mainnet
pub const DEFAULT_CURRENCY_MOSAIC_ID: u64 = 0x6BED_913F_A202_23F8;
