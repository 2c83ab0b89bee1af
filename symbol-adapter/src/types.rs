//! REST payloads and their mapping into ledger types
//!
//! The node encodes uint64 values as decimal strings, mosaic ids as hex
//! strings and addresses as hex. Receipts that carry no balance change
//! (no target, mosaic or amount) are dropped during mapping.

use crate::{Error, Result};
use harvest_ledger::{Address, HarvestStatement, ReceiptEntry, HARVEST_FEE_RECEIPT_TYPE};
use serde::{Deserialize, Deserializer};

/// One page of a paged endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub data: Vec<T>,
    /// Echoed pagination parameters
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Pagination block of a paged response
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Page size applied by the node (may be clamped)
    pub page_size: u32,
}

/// Filter for harvest fee statements paid to a beneficiary
#[derive(Debug, Clone)]
pub struct HarvestQuery {
    /// Node beneficiary address
    pub beneficiary: Address,
    /// Receipt type (harvest fee)
    pub receipt_type: u16,
    /// Currency mosaic id (artifact id)
    pub mosaic_id: u64,
}

impl HarvestQuery {
    /// Harvest fee statements in the given currency
    pub fn harvest_fees(beneficiary: Address, mosaic_id: u64) -> Self {
        Self {
            beneficiary,
            receipt_type: HARVEST_FEE_RECEIPT_TYPE,
            mosaic_id,
        }
    }

    /// Query string for `/statements/transaction`
    pub fn to_params(&self, from_height: u64) -> Vec<(String, String)> {
        vec![
            ("receiptType".to_string(), self.receipt_type.to_string()),
            ("artifactId".to_string(), format_mosaic_id(self.mosaic_id)),
            ("targetAddress".to_string(), self.beneficiary.to_string()),
            ("fromHeight".to_string(), from_height.to_string()),
        ]
    }
}

/// Item of `/statements/transaction`
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionStatementInfo {
    /// The statement itself
    pub statement: TransactionStatementDto,
}

/// Transaction statement of one block
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionStatementDto {
    /// Block height
    #[serde(deserialize_with = "de_u64")]
    pub height: u64,
    /// Receipts in node order
    #[serde(default)]
    pub receipts: Vec<ReceiptDto>,
}

/// Receipt as served by the node
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDto {
    /// Receipt type identifier
    #[serde(rename = "type")]
    pub receipt_type: u16,
    /// Recipient (hex), balance receipts only
    #[serde(default)]
    pub target_address: Option<String>,
    /// Mosaic id (hex), balance receipts only
    #[serde(default)]
    pub mosaic_id: Option<String>,
    /// Amount, balance receipts only
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub amount: Option<u64>,
}

impl TryFrom<TransactionStatementInfo> for HarvestStatement {
    type Error = Error;

    fn try_from(info: TransactionStatementInfo) -> Result<Self> {
        let height = info.statement.height;
        let mut receipts = Vec::with_capacity(info.statement.receipts.len());

        for dto in info.statement.receipts {
            let (Some(target), Some(mosaic), Some(amount)) =
                (dto.target_address, dto.mosaic_id, dto.amount)
            else {
                continue;
            };

            receipts.push(ReceiptEntry {
                receipt_type: dto.receipt_type,
                target: Address::parse(&target)?,
                mosaic_id: parse_mosaic_id(&mosaic)?,
                amount,
            });
        }

        Ok(HarvestStatement { height, receipts })
    }
}

/// `/blocks/{height}` response
#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    /// Block header
    pub block: BlockHeader,
}

/// Subset of the block header
#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeader {
    /// Milliseconds since the network's genesis epoch
    #[serde(deserialize_with = "de_u64")]
    pub timestamp: u64,
}

/// `/node/unlockedaccount` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAccounts {
    /// Public keys of accounts harvesting on the node
    pub unlocked_account: Vec<String>,
}

/// `/accounts/{id}` response
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    /// Account details
    pub account: AccountDto,
}

/// Subset of account details
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    /// Address (hex)
    pub address: String,
    /// Linked/node/vrf keys
    #[serde(default)]
    pub supplemental_public_keys: Option<SupplementalKeys>,
}

/// Supplemental public keys of an account
#[derive(Debug, Clone, Deserialize)]
pub struct SupplementalKeys {
    /// Key linking a remote account to its main account
    #[serde(default)]
    pub linked: Option<LinkedKey>,
}

/// Linked public key
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedKey {
    /// Public key (hex)
    pub public_key: String,
}

impl AccountDto {
    /// Canonical address of this account
    pub fn address(&self) -> Result<Address> {
        Ok(Address::parse(&self.address)?)
    }

    /// Public key of the linked main account, if any
    pub fn linked_public_key(&self) -> Option<&str> {
        self.supplemental_public_keys
            .as_ref()
            .and_then(|keys| keys.linked.as_ref())
            .map(|linked| linked.public_key.as_str())
    }
}

/// Parse a hex mosaic id
pub fn parse_mosaic_id(raw: &str) -> Result<u64> {
    u64::from_str_radix(raw.trim(), 16)
        .map_err(|e| Error::Decode(format!("mosaic id '{}': {}", raw, e)))
}

/// Format a mosaic id as 16 uppercase hex digits
pub fn format_mosaic_id(id: u64) -> String {
    format!("{:016X}", id)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum U64Repr {
    Num(u64),
    Str(String),
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    match U64Repr::deserialize(deserializer)? {
        U64Repr::Num(n) => Ok(n),
        U64Repr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn de_opt_u64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error> {
    match Option::<U64Repr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(U64Repr::Num(n)) => Ok(Some(n)),
        Some(U64Repr::Str(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}
