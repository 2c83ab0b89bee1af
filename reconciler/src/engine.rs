//! Reconciliation engine
//!
//! Brings the ledger up to date with the chain. Each sync:
//!
//! 1. **Resume**: reload the ledger and take `from = resume_height + 1`
//! 2. **Fetch**: collect every harvest statement at or above `from`
//! 3. **Reconcile**: per statement, split receipts, classify the harvester,
//!    price the kickback, resolve the block time
//! 4. **Commit**: append the record durably before touching the next one
//!
//! A failed or cancelled sync keeps every record committed before the
//! failure; the next sync resumes right after the last one.

use crate::{config::Config, metrics::Metrics, Error, Result};
use chrono::{DateTime, Duration, Utc};
use harvest_ledger::{
    AddressClassifier, HarvestRecord, HarvestStatement, HarvesterClass, LedgerSnapshot,
    LedgerStore, RewardCalculator,
};
use serde::Serialize;
use symbol_adapter::{HarvestQuery, HarvestSource};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// Ledger not read yet
    Uninitialized,
    /// Ledger read, no sync completed since
    Loaded,
    /// Sync in progress
    Syncing,
    /// Last sync completed
    Idle,
}

/// Outcome of one completed sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Correlates the log lines of one run
    pub run_id: Uuid,
    /// First height requested from the node
    pub from_height: u64,
    /// Highest height in the ledger after the run
    pub last_height: Option<u64>,
    /// New records harvested by the operator
    pub operator: usize,
    /// New records harvested by third parties
    pub third_party: usize,
}

impl SyncReport {
    /// Total records appended
    pub fn appended(&self) -> usize {
        self.operator + self.third_party
    }
}

/// Keeps the harvest ledger in step with the node
#[derive(Debug)]
pub struct ReconciliationEngine<S> {
    source: S,
    store: LedgerStore,
    classifier: AddressClassifier,
    calculator: RewardCalculator,
    query: HarvestQuery,
    genesis_epoch: DateTime<Utc>,
    metrics: Metrics,
    state: EngineState,
}

impl<S: HarvestSource> ReconciliationEngine<S> {
    /// Create engine, opening and locking the configured ledger
    pub fn new(source: S, config: &Config) -> Result<Self> {
        config.validate()?;
        let store = LedgerStore::open(config.ledger.clone())?;
        Self::with_store(source, store, config)
    }

    /// Create engine over an already opened ledger
    pub fn with_store(source: S, store: LedgerStore, config: &Config) -> Result<Self> {
        Ok(Self {
            source,
            store,
            classifier: config.classifier()?,
            calculator: config.reward_calculator()?,
            query: config.harvest_query()?,
            genesis_epoch: config.chain.genesis_epoch,
            metrics: Metrics::new()?,
            state: EngineState::Uninitialized,
        })
    }

    /// Read the ledger; required before the first sync
    pub fn initialize(&mut self) -> Result<LedgerSnapshot> {
        let snapshot = self.store.load()?;
        self.state = EngineState::Loaded;
        if let Some(height) = self.store.last_height() {
            self.metrics
                .last_height
                .set(i64::try_from(height).unwrap_or(i64::MAX));
        }

        info!(
            records = snapshot.records.len(),
            resume_height = snapshot.resume_height,
            "Ledger ready"
        );
        Ok(snapshot)
    }

    /// Fetch and record every harvest newer than the ledger
    pub async fn sync(&mut self, cancel: &CancellationToken) -> Result<SyncReport> {
        if self.state == EngineState::Uninitialized {
            self.initialize()?;
        }

        let run_id = Uuid::now_v7();
        self.state = EngineState::Syncing;

        let result = self.run_sync(run_id, cancel).await;

        match &result {
            Ok(report) => {
                self.state = EngineState::Idle;
                self.metrics.record_sync("ok");
                info!(
                    %run_id,
                    operator = report.operator,
                    third_party = report.third_party,
                    last_height = ?report.last_height,
                    "{} blocks harvested by others and {} by the operator since the last check",
                    report.third_party,
                    report.operator
                );
            }
            Err(e) => {
                // Every committed append is a consistent prefix
                self.state = EngineState::Loaded;
                if e.is_cancelled() {
                    self.metrics.record_sync("cancelled");
                    warn!(%run_id, last_height = ?self.store.last_height(), "Sync cancelled");
                } else {
                    self.metrics.record_sync("error");
                    warn!(%run_id, last_height = ?self.store.last_height(), error = %e, "Sync failed");
                }
            }
        }

        result
    }

    async fn run_sync(&mut self, run_id: Uuid, cancel: &CancellationToken) -> Result<SyncReport> {
        let snapshot = self.store.load()?;
        let resume_height = snapshot.resume_height;
        let from_height = resume_height.saturating_add(1);

        info!(%run_id, from_height, "Checking node for new harvests");

        let mut statements = self
            .source
            .fetch_since(&self.query, from_height, cancel)
            .await?;
        statements.sort_by_key(|s| s.height);

        let mut report = SyncReport {
            run_id,
            from_height,
            last_height: self.store.last_height(),
            operator: 0,
            third_party: 0,
        };

        let mut cursor = resume_height;
        for statement in &statements {
            if statement.height <= cursor {
                debug!(height = statement.height, "Skipping already recorded height");
                continue;
            }

            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let record = self.reconcile(statement, cancel).await?;
            self.store.append(&record)?;

            let class = match record.kickback {
                Some(_) => HarvesterClass::ThirdParty,
                None => HarvesterClass::Operator,
            };
            match class {
                HarvesterClass::Operator => report.operator += 1,
                HarvesterClass::ThirdParty => report.third_party += 1,
            }
            self.metrics
                .record_append(class, record.height, record.node_reward);

            info!(
                %run_id,
                height = record.height,
                harvester = %record.harvester,
                class = %class,
                node_reward = record.node_reward,
                kickback = ?record.kickback,
                status = %record.status,
                "Recorded harvested block"
            );

            cursor = record.height;
            report.last_height = Some(record.height);
        }

        Ok(report)
    }

    /// Build the ledger record for one statement
    async fn reconcile(
        &self,
        statement: &HarvestStatement,
        cancel: &CancellationToken,
    ) -> Result<HarvestRecord> {
        let split = self.calculator.split(statement)?;
        let class = self.classifier.classify(&split.harvester);
        let kickback = self.calculator.kickback(split.node_reward);

        let timestamp_ms = self
            .source
            .block_timestamp_ms(statement.height, cancel)
            .await?;
        let timestamp = self.block_time(statement.height, timestamp_ms)?;

        Ok(HarvestRecord::observed(
            class,
            statement.height,
            split.gross_amount,
            split.node_reward,
            kickback,
            split.harvester,
            timestamp,
        ))
    }

    /// Wall-clock time of a block from its network timestamp
    fn block_time(&self, height: u64, timestamp_ms: u64) -> Result<DateTime<Utc>> {
        i64::try_from(timestamp_ms)
            .ok()
            .and_then(|ms| self.genesis_epoch.checked_add_signed(Duration::milliseconds(ms)))
            .ok_or_else(|| {
                Error::Ledger(harvest_ledger::Error::InvalidStatement {
                    height,
                    reason: format!("block timestamp {} out of range", timestamp_ms),
                })
            })
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Harvest data source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The ledger, for reports
    pub fn ledger_mut(&mut self) -> &mut LedgerStore {
        &mut self.store
    }

    /// Operator set in use
    pub fn classifier(&self) -> &AddressClassifier {
        &self.classifier
    }

    /// Metrics of this engine
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
