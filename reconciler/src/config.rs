//! Configuration for the harvest monitor

use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use harvest_ledger::{
    Address, AddressClassifier, LedgerConfig, RewardCalculator, RewardPolicy,
    HARVEST_FEE_RECEIPT_TYPE,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use symbol_adapter::{
    parse_mosaic_id, HarvestQuery, NodeConfig, RetryConfig, DEFAULT_CURRENCY_MOSAIC_ID,
    DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECONDS,
};

/// Harvest monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// REST node to query
    pub node: NodeSection,

    /// Retry policy for node requests
    pub retry: RetryConfig,

    /// Ledger file
    pub ledger: LedgerConfig,

    /// Addresses belonging to the node operator
    pub operator: OperatorConfig,

    /// Kickback pricing
    pub reward: RewardConfig,

    /// Network constants
    pub chain: ChainConfig,
}

/// Node connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Base URL including port
    pub url: String,

    /// Per-request timeout
    pub timeout_seconds: u64,

    /// Requested page size
    pub page_size: u32,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Operator addresses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Node beneficiary; receives the node reward
    pub beneficiary_address: String,

    /// Further operator harvesting addresses (one or two)
    pub addresses: Vec<String>,
}

/// Kickback pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Share of the node reward owed to third-party harvesters
    pub kickback_multiplier: Decimal,

    /// Base units per whole currency unit
    pub unit_scale: u64,

    /// Currency mosaic id (hex)
    pub currency_mosaic_id: String,

    /// Harvest fee receipt type
    pub harvest_fee_receipt_type: u16,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            kickback_multiplier: Decimal::new(2, 1),
            unit_scale: 1_000_000,
            currency_mosaic_id: format!("{:016X}", DEFAULT_CURRENCY_MOSAIC_ID),
            harvest_fee_receipt_type: HARVEST_FEE_RECEIPT_TYPE,
        }
    }
}

/// Network constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Instant block timestamps are counted from
    pub genesis_epoch: DateTime<Utc>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            // Symbol mainnet genesis block
            genesis_epoch: Utc
                .with_ymd_and_hms(2021, 3, 16, 0, 6, 25)
                .single()
                .unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load defaults with environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `HARVEST_*` environment overrides on top of this config
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("HARVEST_NODE_URL") {
            self.node.url = url;
        }

        if let Some(path) = var("HARVEST_LEDGER_PATH") {
            self.ledger.path = PathBuf::from(path);
        }

        if let Some(beneficiary) = var("HARVEST_BENEFICIARY") {
            self.operator.beneficiary_address = beneficiary;
        }

        if let Some(multiplier) = var("HARVEST_KICKBACK_MULTIPLIER") {
            self.reward.kickback_multiplier = Decimal::from_str(multiplier.trim()).map_err(|e| {
                Error::Config(format!("HARVEST_KICKBACK_MULTIPLIER '{}': {}", multiplier, e))
            })?;
        }

        if let Some(format) = var("HARVEST_LEDGER_FORMAT") {
            self.ledger.format = format.parse()?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.node.url.trim().is_empty() {
            return Err(Error::Config("node.url must be set".to_string()));
        }

        if self.node.timeout_seconds == 0 {
            return Err(Error::Config("node.timeout_seconds must be positive".to_string()));
        }

        if self.node.page_size == 0 {
            return Err(Error::Config("node.page_size must be positive".to_string()));
        }

        if self.ledger.path.as_os_str().is_empty() {
            return Err(Error::Config("ledger.path must be set".to_string()));
        }

        if self.operator.addresses.is_empty() || self.operator.addresses.len() > 2 {
            return Err(Error::Config(format!(
                "operator.addresses must list one or two addresses, got {}",
                self.operator.addresses.len()
            )));
        }

        if self.reward.harvest_fee_receipt_type != HARVEST_FEE_RECEIPT_TYPE {
            tracing::warn!(
                receipt_type = self.reward.harvest_fee_receipt_type,
                "Non-standard harvest fee receipt type configured"
            );
        }

        // Surface address, mosaic and multiplier problems before any I/O
        self.beneficiary()?;
        self.classifier()?;
        self.currency_mosaic_id()?;
        self.reward_calculator()?;

        Ok(())
    }

    /// Node beneficiary address
    pub fn beneficiary(&self) -> Result<Address> {
        if self.operator.beneficiary_address.trim().is_empty() {
            return Err(Error::Config(
                "operator.beneficiary_address must be set".to_string(),
            ));
        }
        Ok(Address::parse(&self.operator.beneficiary_address)?)
    }

    /// Operator set: beneficiary plus the listed addresses
    pub fn classifier(&self) -> Result<AddressClassifier> {
        let mut addresses = vec![self.operator.beneficiary_address.clone()];
        addresses.extend(self.operator.addresses.iter().cloned());
        Ok(AddressClassifier::from_config(&addresses)?)
    }

    /// Currency mosaic id
    pub fn currency_mosaic_id(&self) -> Result<u64> {
        Ok(parse_mosaic_id(&self.reward.currency_mosaic_id)?)
    }

    /// Reward calculator for the configured policy
    pub fn reward_calculator(&self) -> Result<RewardCalculator> {
        let policy = RewardPolicy {
            receipt_type: self.reward.harvest_fee_receipt_type,
            unit_scale: self.reward.unit_scale,
            ..RewardPolicy::new(
                self.beneficiary()?,
                self.currency_mosaic_id()?,
                self.reward.kickback_multiplier,
            )
        };
        Ok(RewardCalculator::new(policy)?)
    }

    /// Statement filter for the beneficiary's harvest fees
    pub fn harvest_query(&self) -> Result<HarvestQuery> {
        Ok(HarvestQuery {
            beneficiary: self.beneficiary()?,
            receipt_type: self.reward.harvest_fee_receipt_type,
            mosaic_id: self.currency_mosaic_id()?,
        })
    }

    /// Node client settings
    pub fn node_config(&self) -> NodeConfig {
        NodeConfig {
            url: self.node.url.clone(),
            timeout_seconds: self.node.timeout_seconds,
            page_size: self.node.page_size,
            retry: self.retry.clone(),
        }
    }
}
