//! Prometheus metrics for reconciliation runs
//!
//! # Metrics
//!
//! - `harvest_sync_runs_total{outcome}` - Sync runs by outcome
//! - `harvest_records_appended_total{class}` - Ledger appends by harvester class
//! - `harvest_kickback_accrued_base_units_total` - Node reward behind new third-party records
//! - `harvest_ledger_last_height` - Highest height in the ledger

use harvest_ledger::HarvesterClass;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Sync runs by outcome (`ok`, `error`, `cancelled`)
    pub sync_runs: IntCounterVec,

    /// Appended records by class
    pub records_appended: IntCounterVec,

    /// Node reward (base units) of third-party records
    pub third_party_node_reward: IntCounter,

    /// Last ledger height
    pub last_height: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let sync_runs = IntCounterVec::new(
            Opts::new("harvest_sync_runs_total", "Sync runs by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(sync_runs.clone()))?;

        let records_appended = IntCounterVec::new(
            Opts::new(
                "harvest_records_appended_total",
                "Ledger appends by harvester class",
            ),
            &["class"],
        )?;
        registry.register(Box::new(records_appended.clone()))?;

        let third_party_node_reward = IntCounter::new(
            "harvest_kickback_accrued_base_units_total",
            "Node reward behind new third-party records",
        )?;
        registry.register(Box::new(third_party_node_reward.clone()))?;

        let last_height = IntGauge::new("harvest_ledger_last_height", "Highest height in the ledger")?;
        registry.register(Box::new(last_height.clone()))?;

        Ok(Self {
            sync_runs,
            records_appended,
            third_party_node_reward,
            last_height,
            registry,
        })
    }

    /// Record one appended record
    pub fn record_append(&self, class: HarvesterClass, height: u64, node_reward: u64) {
        let label = match class {
            HarvesterClass::Operator => "operator",
            HarvesterClass::ThirdParty => "third_party",
        };
        self.records_appended.with_label_values(&[label]).inc();
        if class == HarvesterClass::ThirdParty {
            self.third_party_node_reward.inc_by(node_reward);
        }
        self.last_height.set(i64::try_from(height).unwrap_or(i64::MAX));
    }

    /// Record the end of a sync run
    pub fn record_sync(&self, outcome: &str) {
        self.sync_runs.with_label_values(&[outcome]).inc();
    }

    /// Registry contents in Prometheus text format
    pub fn encode_text(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("last_height", &self.last_height.get())
            .finish_non_exhaustive()
    }
}
