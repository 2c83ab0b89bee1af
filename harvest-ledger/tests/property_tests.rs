//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify:
//! - Resume cursor: always the highest appended height (or the floor)
//! - Append-only: rejected appends never reach the file
//! - Kickback bounds: never negative, never above the scaled node reward
//! - Classification partition: operator records never carry a kickback

use chrono::{TimeZone, Utc};
use harvest_ledger::{
    Address, AddressClassifier, HarvestRecord, HarvesterClass, LedgerConfig, LedgerFormat,
    LedgerStore, PaymentStatus, RewardCalculator, RewardPolicy,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

const MOSAIC: u64 = 0x6BED_913F_A202_23F8;

/// Strategy for generating ledger formats
fn format_strategy() -> impl Strategy<Value = LedgerFormat> {
    prop_oneof![Just(LedgerFormat::V1), Just(LedgerFormat::Legacy)]
}

/// Strategy for generating addresses
fn address_strategy() -> impl Strategy<Value = Address> {
    any::<[u8; 24]>().prop_map(|bytes| Address::from_bytes(&bytes))
}

/// Strategy for kickback multipliers in [0, 1] with up to 4 decimals
fn multiplier_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000).prop_map(|bp| Decimal::new(bp, 4))
}

fn record(height: u64, harvester: Address, class: HarvesterClass) -> HarvestRecord {
    HarvestRecord::observed(
        class,
        height,
        1_000,
        500,
        Decimal::new(5, 4),
        harvester,
        Utc.with_ymd_and_hms(2021, 3, 16, 0, 6, 25).unwrap(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: the resume height after reload equals the max height appended
    #[test]
    fn prop_resume_height_is_max(
        heights in prop::collection::btree_set(1u64..1_000_000, 0..30),
        floor in 0u64..10,
        format in format_strategy(),
    ) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            path: temp_dir.path().join("harvested.txt"),
            format,
            height_floor: floor,
        };

        {
            let mut store = LedgerStore::open(config.clone()).unwrap();
            for height in &heights {
                store.append(&record(*height, Address::from_bytes(&[1; 24]), HarvesterClass::ThirdParty)).unwrap();
            }
        }

        let mut store = LedgerStore::open(config).unwrap();
        let snapshot = store.load().unwrap();

        let expected = heights.iter().max().copied().unwrap_or(floor);
        prop_assert_eq!(snapshot.resume_height, expected);
        prop_assert_eq!(snapshot.records.len(), heights.len());
        prop_assert!(snapshot.records.keys().copied().eq(heights.iter().copied()));
    }

    /// Property: out-of-order appends are rejected and leave the file untouched
    #[test]
    fn prop_rejected_appends_leave_no_trace(heights in prop::collection::vec(1u64..500, 1..40)) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            path: temp_dir.path().join("harvested.txt"),
            ..Default::default()
        };
        let mut store = LedgerStore::open(config).unwrap();

        let mut accepted = Vec::new();
        for height in heights {
            let result = store.append(&record(height, Address::from_bytes(&[2; 24]), HarvesterClass::Operator));
            if accepted.last().map_or(true, |last| height > *last) {
                prop_assert!(result.is_ok());
                accepted.push(height);
            } else {
                prop_assert!(result.is_err());
            }
        }

        let snapshot = store.load().unwrap();
        prop_assert!(snapshot.records.keys().copied().eq(accepted.into_iter()));
    }

    /// Property: kickback lies in [0, node_reward / unit_scale]
    #[test]
    fn prop_kickback_bounds(node_reward in 0u64..10_000_000_000u64, multiplier in multiplier_strategy()) {
        let policy = RewardPolicy::new(Address::from_bytes(&[3; 24]), MOSAIC, multiplier);
        let calc = RewardCalculator::new(policy).unwrap();

        let kickback = calc.kickback(node_reward);
        let ceiling = Decimal::from(node_reward) / Decimal::from(1_000_000u64);

        prop_assert!(kickback >= Decimal::ZERO);
        prop_assert!(kickback <= ceiling);
    }

    /// Property: every record is exactly one class and operators owe nothing
    #[test]
    fn prop_classification_partition(
        operator in prop::collection::vec(address_strategy(), 1..3),
        harvester in address_strategy(),
        pick_operator in any::<bool>(),
    ) {
        let classifier = AddressClassifier::new(operator.clone());
        let harvester = if pick_operator { operator[0].clone() } else { harvester };

        let class = classifier.classify(&harvester);
        let record = record(1, harvester.clone(), class);

        match class {
            HarvesterClass::Operator => {
                prop_assert!(operator.contains(&harvester));
                prop_assert_eq!(record.status, PaymentStatus::HarvestedByOperator);
                prop_assert!(record.kickback.is_none());
            }
            HarvesterClass::ThirdParty => {
                prop_assert!(!operator.contains(&harvester));
                prop_assert_eq!(record.status, PaymentStatus::Unpaid);
                prop_assert!(record.kickback.is_some());
            }
        }
    }
}
