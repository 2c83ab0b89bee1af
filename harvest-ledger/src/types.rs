//! Core types for the ledger
//!
//! All types are designed for:
//! - Exact arithmetic (Decimal for kickbacks, integer base units for receipts)
//! - Transport independence (the adapter maps JSON into these)

use crate::address::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Harvest fee receipt type (0x2143)
pub const HARVEST_FEE_RECEIPT_TYPE: u16 = 0x2143;

/// Who harvested a block, relative to the configured operator set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarvesterClass {
    /// One of the operator's own addresses
    Operator,
    /// A delegated harvester owed a kickback
    ThirdParty,
}

impl fmt::Display for HarvesterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarvesterClass::Operator => write!(f, "operator"),
            HarvesterClass::ThirdParty => write!(f, "third-party"),
        }
    }
}

/// Payment status of a harvested block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Harvested by the operator, nothing owed
    HarvestedByOperator,
    /// Kickback owed to a third party
    Unpaid,
    /// Kickback paid (set by hand-editing the ledger)
    Paid,
}

impl PaymentStatus {
    /// Label used in the legacy line format
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::HarvestedByOperator => "Harvested by me",
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Paid => "Paid",
        }
    }

    /// Parse a label, ignoring case and surrounding whitespace
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "harvested by me" => Some(PaymentStatus::HarvestedByOperator),
            "unpaid" => Some(PaymentStatus::Unpaid),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One receipt attached to a block's transaction statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptEntry {
    /// Receipt type identifier
    pub receipt_type: u16,
    /// Recipient of the receipt
    pub target: Address,
    /// Mosaic the amount is denominated in
    pub mosaic_id: u64,
    /// Amount in base units
    pub amount: u64,
}

/// All receipts of one block relevant to the beneficiary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestStatement {
    /// Block height
    pub height: u64,
    /// Receipts in upstream order (order is not relied upon)
    pub receipts: Vec<ReceiptEntry>,
}

/// One row of the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestRecord {
    /// Block height (unique, strictly increasing)
    pub height: u64,

    /// Harvester's harvest fee receipt amount (base units)
    pub gross_amount: u64,

    /// Beneficiary's harvest fee receipt amount (base units)
    pub node_reward: u64,

    /// Kickback owed, third-party records only
    pub kickback: Option<Decimal>,

    /// Canonical address of the harvester
    pub harvester: Address,

    /// Block time
    pub timestamp: DateTime<Utc>,

    /// Payment status
    pub status: PaymentStatus,
}

impl HarvestRecord {
    /// Build a freshly observed record.
    ///
    /// Operator records start as `HarvestedByOperator` with no kickback;
    /// third-party records start as `Unpaid` and keep the given kickback.
    pub fn observed(
        class: HarvesterClass,
        height: u64,
        gross_amount: u64,
        node_reward: u64,
        kickback: Decimal,
        harvester: Address,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let (status, kickback) = match class {
            HarvesterClass::Operator => (PaymentStatus::HarvestedByOperator, None),
            HarvesterClass::ThirdParty => (PaymentStatus::Unpaid, Some(kickback)),
        };

        Self {
            height,
            gross_amount,
            node_reward,
            kickback,
            harvester,
            timestamp,
            status,
        }
    }

    /// Whether a kickback is still owed
    pub fn is_unpaid(&self) -> bool {
        self.status == PaymentStatus::Unpaid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn addr() -> Address {
        Address::from_bytes(&[0x68; 24])
    }

    #[test]
    fn test_status_labels_ignore_case() {
        assert_eq!(PaymentStatus::from_label("UNPAID"), Some(PaymentStatus::Unpaid));
        assert_eq!(PaymentStatus::from_label(" paid "), Some(PaymentStatus::Paid));
        assert_eq!(
            PaymentStatus::from_label("Harvested by me"),
            Some(PaymentStatus::HarvestedByOperator)
        );
        assert_eq!(PaymentStatus::from_label("pending"), None);
    }

    #[test]
    fn test_observed_operator_has_no_kickback() {
        let record = HarvestRecord::observed(
            HarvesterClass::Operator,
            10,
            100,
            50,
            dec!(1.5),
            addr(),
            Utc::now(),
        );
        assert_eq!(record.status, PaymentStatus::HarvestedByOperator);
        assert_eq!(record.kickback, None);
        assert!(!record.is_unpaid());
    }

    #[test]
    fn test_observed_third_party_starts_unpaid() {
        let record = HarvestRecord::observed(
            HarvesterClass::ThirdParty,
            10,
            100,
            50,
            dec!(1.5),
            addr(),
            Utc::now(),
        );
        assert_eq!(record.status, PaymentStatus::Unpaid);
        assert_eq!(record.kickback, Some(dec!(1.5)));
        assert!(record.is_unpaid());
    }
}
