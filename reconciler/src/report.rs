//! Listings over the ledger and the node
//!
//! Ledger listings always reload the file first so that statuses edited by
//! hand (e.g. `Unpaid` -> `Paid`) show up without restarting.

use crate::Result;
use harvest_ledger::{
    Address, AddressClassifier, HarvestRecord, HarvesterClass, LedgerStore, PaymentStatus,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use symbol_adapter::NodeDirectory;
use tokio_util::sync::CancellationToken;

/// Kickbacks still owed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnpaidSummary {
    /// Heights with status `Unpaid`, ascending
    pub heights: Vec<u64>,
    /// Sum of their kickbacks
    pub total_kickback: Decimal,
}

/// Ledger-wide counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    /// Blocks harvested by the operator
    pub operator: usize,
    /// Third-party blocks not yet paid
    pub unpaid: usize,
    /// Third-party blocks paid
    pub paid: usize,
    /// Node reward over all records (base units)
    pub node_reward: u64,
    /// Kickback still owed
    pub unpaid_kickback: Decimal,
}

impl Totals {
    /// All records
    pub fn records(&self) -> usize {
        self.operator + self.unpaid + self.paid
    }
}

/// Accounts harvesting on the node, split by owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvesterRoster {
    /// Operator addresses currently harvesting
    pub operator: Vec<Address>,
    /// Delegated third-party harvesters
    pub third_party: Vec<Address>,
}

/// Unpaid heights and the total owed
pub fn unpaid(store: &mut LedgerStore) -> Result<UnpaidSummary> {
    let snapshot = store.load()?;
    let mut summary = UnpaidSummary {
        heights: Vec::new(),
        total_kickback: Decimal::ZERO,
    };

    for record in snapshot.unpaid() {
        summary.heights.push(record.height);
        summary.total_kickback += record.kickback.unwrap_or_default();
    }

    Ok(summary)
}

/// Every third-party record, paid or not
pub fn third_party(store: &mut LedgerStore) -> Result<Vec<HarvestRecord>> {
    let snapshot = store.load()?;
    Ok(snapshot
        .records
        .into_values()
        .filter(|r| r.status != PaymentStatus::HarvestedByOperator)
        .collect())
}

/// Every record in height order
pub fn all(store: &mut LedgerStore) -> Result<Vec<HarvestRecord>> {
    Ok(store.load()?.records.into_values().collect())
}

/// Counts per status and reward sums
pub fn totals(store: &mut LedgerStore) -> Result<Totals> {
    let snapshot = store.load()?;
    let mut totals = Totals {
        operator: 0,
        unpaid: 0,
        paid: 0,
        node_reward: 0,
        unpaid_kickback: Decimal::ZERO,
    };

    for record in snapshot.records.values() {
        match record.status {
            PaymentStatus::HarvestedByOperator => totals.operator += 1,
            PaymentStatus::Unpaid => {
                totals.unpaid += 1;
                totals.unpaid_kickback += record.kickback.unwrap_or_default();
            }
            PaymentStatus::Paid => totals.paid += 1,
        }
        totals.node_reward = totals.node_reward.saturating_add(record.node_reward);
    }

    Ok(totals)
}

/// Blocks on chain whose beneficiary is `beneficiary`
pub async fn harvested_block_count<D: NodeDirectory>(
    directory: &D,
    beneficiary: &Address,
    cancel: &CancellationToken,
) -> Result<usize> {
    Ok(directory.harvested_block_count(beneficiary, cancel).await?)
}

/// Block count for every operator address, in address order
pub async fn operator_block_counts<D: NodeDirectory>(
    directory: &D,
    classifier: &AddressClassifier,
    cancel: &CancellationToken,
) -> Result<Vec<(Address, usize)>> {
    let mut addresses: Vec<&Address> = classifier.addresses().collect();
    addresses.sort();

    let mut counts = Vec::with_capacity(addresses.len());
    for address in addresses {
        let count = directory.harvested_block_count(address, cancel).await?;
        counts.push((address.clone(), count));
    }
    Ok(counts)
}

/// Accounts harvesting on the node, split into operator and third party
pub async fn delegated_harvesters<D: NodeDirectory>(
    directory: &D,
    classifier: &AddressClassifier,
    cancel: &CancellationToken,
) -> Result<HarvesterRoster> {
    let mut roster = HarvesterRoster::default();
    for address in directory.delegated_harvesters(cancel).await? {
        match classifier.classify(&address) {
            HarvesterClass::Operator => roster.operator.push(address),
            HarvesterClass::ThirdParty => roster.third_party.push(address),
        }
    }
    Ok(roster)
}

/// One ledger row for terminal output
#[derive(Debug)]
pub struct RecordLine<'a>(pub &'a HarvestRecord);

impl fmt::Display for RecordLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        let kickback = match record.kickback {
            Some(amount) => amount.to_string(),
            None => "N/A".to_string(),
        };
        write!(
            f,
            "{:>10}  {}  {}  node reward {:>12}  kickback {:>12}  {}",
            record.height,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.harvester,
            record.node_reward,
            kickback,
            record.status
        )
    }
}

impl fmt::Display for UnpaidSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} unpaid blocks on record:", self.heights.len())?;
        let heights: Vec<String> = self.heights.iter().map(u64::to_string).collect();
        writeln!(f, "[{}]", heights.join(", "))?;
        write!(f, "Total kickback owed: {}", self.total_kickback)
    }
}

impl fmt::Display for Totals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records:              {}", self.records())?;
        writeln!(f, "Harvested by operator: {}", self.operator)?;
        writeln!(f, "Unpaid:               {}", self.unpaid)?;
        writeln!(f, "Paid:                 {}", self.paid)?;
        writeln!(f, "Node reward (base):   {}", self.node_reward)?;
        write!(f, "Kickback owed:        {}", self.unpaid_kickback)
    }
}

impl fmt::Display for HarvesterRoster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Other harvesters presently delegated to the node:")?;
        for address in &self.third_party {
            writeln!(f, "  {}", address)?;
        }
        writeln!(f, "Operator addresses harvesting on the node:")?;
        for address in &self.operator {
            writeln!(f, "  {}", address)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use harvest_ledger::{LedgerConfig, LedgerFormat};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn record(height: u64, class: HarvesterClass, node_reward: u64) -> HarvestRecord {
        HarvestRecord::observed(
            class,
            height,
            node_reward * 3,
            node_reward,
            Decimal::from(node_reward) * dec!(0.2) / dec!(1000000),
            Address::from_bytes(&[height as u8; 24]),
            Utc.with_ymd_and_hms(2021, 4, 1, 12, 0, 0).unwrap(),
        )
    }

    fn store(dir: &TempDir) -> LedgerStore {
        let mut store = LedgerStore::open(LedgerConfig {
            path: dir.path().join("ledger.txt"),
            format: LedgerFormat::Legacy,
            height_floor: 0,
        })
        .unwrap();
        store
            .append(&record(10, HarvesterClass::ThirdParty, 50_000_000))
            .unwrap();
        store
            .append(&record(11, HarvesterClass::Operator, 40_000_000))
            .unwrap();
        store
            .append(&record(12, HarvesterClass::ThirdParty, 25_000_000))
            .unwrap();
        store
    }

    #[test]
    fn test_unpaid_and_totals() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        let summary = unpaid(&mut store).unwrap();
        assert_eq!(summary.heights, vec![10, 12]);
        assert_eq!(summary.total_kickback, dec!(15));

        let totals = totals(&mut store).unwrap();
        assert_eq!(totals.records(), 3);
        assert_eq!(totals.operator, 1);
        assert_eq!(totals.unpaid, 2);
        assert_eq!(totals.paid, 0);
        assert_eq!(totals.node_reward, 115_000_000);
        assert_eq!(totals.unpaid_kickback, dec!(15));
    }

    #[test]
    fn test_listing_reflects_external_edit() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        assert_eq!(third_party(&mut store).unwrap().len(), 2);

        let path = store.path().to_path_buf();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replacen("Status,Unpaid,", "Status,PAID,", 1)).unwrap();

        let summary = unpaid(&mut store).unwrap();
        assert_eq!(summary.heights, vec![12]);
        assert_eq!(summary.total_kickback, dec!(5));

        let listed = third_party(&mut store).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].status, PaymentStatus::Paid);

        let heights: Vec<u64> = all(&mut store).unwrap().iter().map(|r| r.height).collect();
        assert_eq!(heights, vec![10, 11, 12]);
    }

    #[test]
    fn test_record_line() {
        let line = RecordLine(&record(11, HarvesterClass::Operator, 1)).to_string();
        assert!(line.contains("N/A"));
        assert!(line.contains("2021-04-01 12:00:00"));
    }

    struct StaticDirectory {
        harvesters: Vec<Address>,
        counts: HashMap<Address, usize>,
    }

    #[async_trait]
    impl NodeDirectory for StaticDirectory {
        async fn harvested_block_count(
            &self,
            beneficiary: &Address,
            _cancel: &CancellationToken,
        ) -> symbol_adapter::Result<usize> {
            Ok(self.counts.get(beneficiary).copied().unwrap_or(0))
        }

        async fn delegated_harvesters(
            &self,
            _cancel: &CancellationToken,
        ) -> symbol_adapter::Result<Vec<Address>> {
            Ok(self.harvesters.clone())
        }
    }

    #[tokio::test]
    async fn test_roster_split() {
        let mine = Address::from_bytes(&[0x11; 24]);
        let theirs = Address::from_bytes(&[0x68; 24]);
        let directory = StaticDirectory {
            harvesters: vec![theirs.clone(), mine.clone()],
            counts: HashMap::from([(mine.clone(), 42)]),
        };
        let classifier = AddressClassifier::new([mine.clone()]);
        let cancel = CancellationToken::new();

        let roster = delegated_harvesters(&directory, &classifier, &cancel)
            .await
            .unwrap();
        assert_eq!(roster.operator, vec![mine.clone()]);
        assert_eq!(roster.third_party, vec![theirs]);

        let count = harvested_block_count(&directory, &mine, &cancel).await.unwrap();
        assert_eq!(count, 42);
    }

    #[tokio::test]
    async fn test_counts_every_operator_address() {
        let beneficiary = Address::from_bytes(&[0x68; 24]);
        let second = Address::from_bytes(&[0x11; 24]);
        let directory = StaticDirectory {
            harvesters: Vec::new(),
            counts: HashMap::from([(beneficiary.clone(), 12), (second.clone(), 3)]),
        };
        let classifier = AddressClassifier::new([beneficiary.clone(), second.clone()]);

        let counts = operator_block_counts(&directory, &classifier, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(counts.len(), 2);
        assert!(counts.contains(&(beneficiary, 12)));
        assert!(counts.contains(&(second, 3)));
        assert!(counts[0].0.as_str() < counts[1].0.as_str());
    }
}
