//! Reward split and kickback arithmetic
//!
//! A harvest statement carries several harvest fee receipts for one block:
//! the harvester's payout, the network sink and the beneficiary's (node)
//! share. Receipts are picked by type, mosaic, target and amount rather
//! than by their position in the list. The harvester's payout is always
//! larger than the network sink's, so it is the largest non-node receipt.

use crate::{
    address::Address,
    types::{HarvestStatement, ReceiptEntry, HARVEST_FEE_RECEIPT_TYPE},
    Error, Result,
};
use rust_decimal::Decimal;

/// Parameters for pricing a statement
#[derive(Debug, Clone)]
pub struct RewardPolicy {
    /// Node beneficiary address (receives the node share)
    pub beneficiary: Address,
    /// Receipt type carrying harvest fees
    pub receipt_type: u16,
    /// Network currency mosaic id
    pub currency_mosaic_id: u64,
    /// Share of the node reward paid back, in [0, 1]
    pub kickback_multiplier: Decimal,
    /// Base units per display unit
    pub unit_scale: u64,
}

impl RewardPolicy {
    /// Policy with the network defaults (harvest fee type, 10^6 divisibility)
    pub fn new(beneficiary: Address, currency_mosaic_id: u64, kickback_multiplier: Decimal) -> Self {
        Self {
            beneficiary,
            receipt_type: HARVEST_FEE_RECEIPT_TYPE,
            currency_mosaic_id,
            kickback_multiplier,
            unit_scale: 1_000_000,
        }
    }
}

/// Amounts extracted from one statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardSplit {
    /// Address that harvested the block
    pub harvester: Address,
    /// Harvester's receipt amount
    pub gross_amount: u64,
    /// Beneficiary's receipt amount
    pub node_reward: u64,
}

/// Derives node reward and kickback from raw receipts
#[derive(Debug, Clone)]
pub struct RewardCalculator {
    policy: RewardPolicy,
}

impl RewardCalculator {
    /// Create calculator, validating multiplier and scale
    pub fn new(policy: RewardPolicy) -> Result<Self> {
        if policy.kickback_multiplier < Decimal::ZERO || policy.kickback_multiplier > Decimal::ONE {
            return Err(Error::Config(format!(
                "kickback multiplier {} outside [0, 1]",
                policy.kickback_multiplier
            )));
        }

        if policy.unit_scale == 0 {
            return Err(Error::Config("unit scale must be positive".to_string()));
        }

        Ok(Self { policy })
    }

    /// Select harvester and beneficiary receipts from a statement
    pub fn split(&self, statement: &HarvestStatement) -> Result<RewardSplit> {
        let candidates: Vec<(usize, &ReceiptEntry)> = statement
            .receipts
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.receipt_type == self.policy.receipt_type
                    && r.mosaic_id == self.policy.currency_mosaic_id
            })
            .collect();

        // When the beneficiary also harvested, it appears twice; the later one is the node share
        let (node_idx, node) = candidates
            .iter()
            .rev()
            .find(|(_, r)| r.target == self.policy.beneficiary)
            .copied()
            .ok_or_else(|| Error::InvalidStatement {
                height: statement.height,
                reason: format!(
                    "no harvest fee receipt for beneficiary {}",
                    self.policy.beneficiary
                ),
            })?;

        // Earliest receipt wins a tie
        let harvester = candidates
            .iter()
            .filter(|(idx, _)| *idx != node_idx)
            .max_by(|(ia, a), (ib, b)| a.amount.cmp(&b.amount).then(ib.cmp(ia)))
            .map(|(_, r)| *r)
            .unwrap_or(node);

        Ok(RewardSplit {
            harvester: harvester.target.clone(),
            gross_amount: harvester.amount,
            node_reward: node.amount,
        })
    }

    /// Kickback in display units: `node_reward * multiplier / unit_scale`
    pub fn kickback(&self, node_reward: u64) -> Decimal {
        (Decimal::from(node_reward) * self.policy.kickback_multiplier
            / Decimal::from(self.policy.unit_scale))
        .normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MOSAIC: u64 = 0x6BED_913F_A202_23F8;

    fn beneficiary() -> Address {
        Address::from_bytes(&[0x68; 24])
    }

    fn harvester() -> Address {
        Address::from_bytes(&[0x69; 24])
    }

    fn sink() -> Address {
        Address::from_bytes(&[0x6A; 24])
    }

    fn receipt(target: Address, amount: u64) -> ReceiptEntry {
        ReceiptEntry {
            receipt_type: HARVEST_FEE_RECEIPT_TYPE,
            target,
            mosaic_id: MOSAIC,
            amount,
        }
    }

    fn calculator(multiplier: Decimal) -> RewardCalculator {
        RewardCalculator::new(RewardPolicy::new(beneficiary(), MOSAIC, multiplier)).unwrap()
    }

    #[test]
    fn test_kickback_matches_documented_sample() {
        let calc = calculator(dec!(0.2));
        assert_eq!(calc.kickback(48_008_115), dec!(9.601623));
        assert_eq!(calc.kickback(48_008_115).to_string(), "9.601623");
    }

    #[test]
    fn test_kickback_zero_multiplier() {
        assert_eq!(calculator(Decimal::ZERO).kickback(48_008_115), Decimal::ZERO);
    }

    #[test]
    fn test_split_standard_order() {
        let statement = HarvestStatement {
            height: 100,
            receipts: vec![
                receipt(harvester(), 134_422_724),
                receipt(sink(), 10_000_000),
                receipt(beneficiary(), 48_008_115),
            ],
        };

        let split = calculator(dec!(0.2)).split(&statement).unwrap();
        assert_eq!(split.harvester, harvester());
        assert_eq!(split.gross_amount, 134_422_724);
        assert_eq!(split.node_reward, 48_008_115);
    }

    #[test]
    fn test_split_independent_of_receipt_order() {
        let statement = HarvestStatement {
            height: 100,
            receipts: vec![
                receipt(beneficiary(), 48_008_115),
                ReceiptEntry {
                    receipt_type: 0x124D,
                    target: sink(),
                    mosaic_id: MOSAIC,
                    amount: 1,
                },
                receipt(harvester(), 134_422_724),
            ],
        };

        let split = calculator(dec!(0.2)).split(&statement).unwrap();
        assert_eq!(split.harvester, harvester());
        assert_eq!(split.node_reward, 48_008_115);
    }

    #[test]
    fn test_split_sink_listed_before_harvester() {
        let statement = HarvestStatement {
            height: 100,
            receipts: vec![
                receipt(sink(), 5),
                receipt(harvester(), 134_422_724),
                receipt(beneficiary(), 48_008_115),
            ],
        };

        let split = calculator(dec!(0.2)).split(&statement).unwrap();
        assert_eq!(split.harvester, harvester());
        assert_eq!(split.gross_amount, 134_422_724);
        assert_eq!(split.node_reward, 48_008_115);
    }

    #[test]
    fn test_split_beneficiary_harvested_itself_after_sink() {
        let statement = HarvestStatement {
            height: 9,
            receipts: vec![
                receipt(sink(), 5),
                receipt(beneficiary(), 90),
                receipt(beneficiary(), 30),
            ],
        };

        let split = calculator(dec!(0.2)).split(&statement).unwrap();
        assert_eq!(split.harvester, beneficiary());
        assert_eq!(split.gross_amount, 90);
    }

    #[test]
    fn test_split_beneficiary_harvested_itself() {
        let statement = HarvestStatement {
            height: 7,
            receipts: vec![
                receipt(beneficiary(), 90),
                receipt(sink(), 5),
                receipt(beneficiary(), 30),
            ],
        };

        let split = calculator(dec!(0.2)).split(&statement).unwrap();
        assert_eq!(split.harvester, beneficiary());
        assert_eq!(split.gross_amount, 90);
        assert_eq!(split.node_reward, 30);
    }

    #[test]
    fn test_split_without_beneficiary_receipt_fails() {
        let statement = HarvestStatement {
            height: 7,
            receipts: vec![receipt(harvester(), 90)],
        };

        let err = calculator(dec!(0.2)).split(&statement).unwrap_err();
        assert!(matches!(err, Error::InvalidStatement { height: 7, .. }));
    }

    #[test]
    fn test_other_mosaics_ignored() {
        let mut foreign = receipt(beneficiary(), 999);
        foreign.mosaic_id = 1;
        let statement = HarvestStatement {
            height: 8,
            receipts: vec![receipt(harvester(), 90), receipt(beneficiary(), 30), foreign],
        };

        let split = calculator(dec!(0.2)).split(&statement).unwrap();
        assert_eq!(split.node_reward, 30);
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let policy = RewardPolicy::new(beneficiary(), MOSAIC, dec!(1.5));
        assert!(matches!(RewardCalculator::new(policy), Err(Error::Config(_))));

        let mut policy = RewardPolicy::new(beneficiary(), MOSAIC, dec!(0.2));
        policy.unit_scale = 0;
        assert!(matches!(RewardCalculator::new(policy), Err(Error::Config(_))));
    }
}
