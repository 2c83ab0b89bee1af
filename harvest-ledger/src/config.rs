//! Configuration for the ledger file

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// On-disk line format used for new appends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerFormat {
    /// Versioned JSON object per line
    #[default]
    V1,
    /// `key,value,` pairs compatible with existing harvest logs
    Legacy,
}

impl fmt::Display for LedgerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerFormat::V1 => write!(f, "v1"),
            LedgerFormat::Legacy => write!(f, "legacy"),
        }
    }
}

impl FromStr for LedgerFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(LedgerFormat::V1),
            "legacy" => Ok(LedgerFormat::Legacy),
            other => Err(crate::Error::Config(format!(
                "unknown ledger format '{}'",
                other
            ))),
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Ledger file path
    pub path: PathBuf,

    /// Format for new lines (reads accept both)
    pub format: LedgerFormat,

    /// Resume height used while the ledger is empty
    pub height_floor: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/harvested_blocks.txt"),
            format: LedgerFormat::V1,
            height_floor: 0,
        }
    }
}

impl LedgerConfig {
    /// Lock file guarding the ledger against other processes
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }
}
