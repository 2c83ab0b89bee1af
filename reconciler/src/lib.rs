//! Harvest Reconciler
//!
//! Tracks blocks harvested through a Symbol node and the kickbacks owed to
//! delegated harvesters.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   statements    ┌──────────────────────┐   records   ┌──────────────┐
//! │  NodeClient  │ ──────────────▶ │ ReconciliationEngine │ ──────────▶ │ LedgerStore  │
//! └──────────────┘                 └──────────────────────┘             └──────────────┘
//!        ▲                                                                     │
//!        └──────────────────────────── report ◀────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use reconciler::{Config, ReconciliationEngine};
//! use symbol_adapter::NodeClient;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> reconciler::Result<()> {
//!     let config = Config::from_file("harvest-monitor.toml")?;
//!     let client = NodeClient::new(config.node_config())?;
//!     let mut engine = ReconciliationEngine::new(client, &config)?;
//!
//!     let report = engine.sync(&CancellationToken::new()).await?;
//!     println!("{} new third-party blocks", report.third_party);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;

// Re-exports
pub use config::Config;
pub use engine::{EngineState, ReconciliationEngine, SyncReport};
pub use error::{Error, Result};
pub use metrics::Metrics;
