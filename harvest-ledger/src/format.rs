//! Line codecs for the ledger file
//!
//! # Formats
//!
//! - `legacy` - `key,value,` pairs, no quoting, newline terminated:
//!   `height,123456,harvestAmount,134422724,nodeReward(satoshis),48008115,kickbackAmount,9.601623,Address,SAAA...,Date/Time,2021-08-29 11:05:34.524000,Status,Unpaid,`
//! - `v1` - one JSON object per line tagged with `"v":1`
//!
//! Decoding picks the codec per line, so a legacy file can keep growing in
//! `v1` without being rewritten.

use crate::{
    address::Address,
    config::LedgerFormat,
    types::{HarvestRecord, PaymentStatus},
    Error, Result,
};
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

const KEY_HEIGHT: &str = "height";
const KEY_GROSS: &str = "harvestAmount";
const KEY_NODE_REWARD: &str = "nodeReward(satoshis)";
const KEY_KICKBACK: &str = "kickbackAmount";
const KEY_ADDRESS: &str = "Address";
const KEY_TIME: &str = "Date/Time";
const KEY_STATUS: &str = "Status";

const NOT_APPLICABLE: &str = "N/A";
const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct LineV1 {
    v: u32,
    height: u64,
    gross_amount: u64,
    node_reward: u64,
    kickback: Option<Decimal>,
    harvester: Address,
    timestamp: DateTime<Utc>,
    status: PaymentStatus,
}

/// Serialize one record as a complete, newline terminated line
pub fn encode_line(record: &HarvestRecord, format: LedgerFormat) -> Result<String> {
    match format {
        LedgerFormat::Legacy => Ok(encode_legacy(record)),
        LedgerFormat::V1 => {
            let line = LineV1 {
                v: CURRENT_VERSION,
                height: record.height,
                gross_amount: record.gross_amount,
                node_reward: record.node_reward,
                kickback: record.kickback,
                harvester: record.harvester.clone(),
                timestamp: record.timestamp,
                status: record.status,
            };
            let mut out = serde_json::to_string(&line)?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// Parse one line (without its terminator); `line_no` is 1-based
pub fn decode_line(line_no: usize, line: &str) -> Result<HarvestRecord> {
    let line = line.trim_end_matches('\r');
    if line.trim_start().starts_with('{') {
        decode_v1(line_no, line)
    } else {
        decode_legacy(line_no, line)
    }
}

/// Float-style amount: whole numbers keep one decimal place (`10.0`)
fn legacy_amount(amount: Decimal) -> String {
    let amount = amount.normalize();
    if amount.scale() == 0 {
        format!("{}.0", amount)
    } else {
        amount.to_string()
    }
}

fn encode_legacy(record: &HarvestRecord) -> String {
    let kickback = record
        .kickback
        .map(legacy_amount)
        .unwrap_or_else(|| NOT_APPLICABLE.to_string());

    let fields = [
        (KEY_HEIGHT, record.height.to_string()),
        (KEY_GROSS, record.gross_amount.to_string()),
        (KEY_NODE_REWARD, record.node_reward.to_string()),
        (KEY_KICKBACK, kickback),
        (KEY_ADDRESS, record.harvester.to_string()),
        (KEY_TIME, format_legacy_time(&record.timestamp)),
        (KEY_STATUS, record.status.label().to_string()),
    ];

    let mut out = String::with_capacity(160);
    for (key, value) in fields {
        out.push_str(key);
        out.push(',');
        out.push_str(&value);
        out.push(',');
    }
    out.push('\n');
    out
}

fn decode_v1(line_no: usize, line: &str) -> Result<HarvestRecord> {
    let parsed: LineV1 =
        serde_json::from_str(line).map_err(|e| Error::parse(line_no, e.to_string()))?;

    if parsed.v != CURRENT_VERSION {
        return Err(Error::parse(
            line_no,
            format!("unsupported record version {}", parsed.v),
        ));
    }

    Ok(HarvestRecord {
        height: parsed.height,
        gross_amount: parsed.gross_amount,
        node_reward: parsed.node_reward,
        kickback: parsed.kickback,
        harvester: parsed.harvester,
        timestamp: parsed.timestamp,
        status: parsed.status,
    })
}

fn decode_legacy(line_no: usize, line: &str) -> Result<HarvestRecord> {
    let body = line
        .strip_suffix(',')
        .ok_or_else(|| Error::parse(line_no, "missing trailing separator"))?;

    let tokens: Vec<&str> = body.split(',').collect();
    if tokens.len() % 2 != 0 {
        return Err(Error::parse(
            line_no,
            format!("odd number of fields ({})", tokens.len()),
        ));
    }

    let fields: HashMap<&str, &str> = tokens
        .chunks_exact(2)
        .map(|pair| (pair[0].trim(), pair[1].trim()))
        .collect();

    let field = |key: &str| {
        fields
            .get(key)
            .copied()
            .ok_or_else(|| Error::parse(line_no, format!("missing field '{}'", key)))
    };
    let bad = |key: &str, detail: String| Error::parse(line_no, format!("{}: {}", key, detail));

    let height = field(KEY_HEIGHT)?
        .parse::<u64>()
        .map_err(|e| bad(KEY_HEIGHT, e.to_string()))?;
    let gross_amount = field(KEY_GROSS)?
        .parse::<u64>()
        .map_err(|e| bad(KEY_GROSS, e.to_string()))?;
    let node_reward = field(KEY_NODE_REWARD)?
        .parse::<u64>()
        .map_err(|e| bad(KEY_NODE_REWARD, e.to_string()))?;

    let kickback = match field(KEY_KICKBACK)? {
        NOT_APPLICABLE => None,
        raw => Some(parse_decimal(raw).map_err(|e| bad(KEY_KICKBACK, e))?),
    };

    let harvester =
        Address::parse(field(KEY_ADDRESS)?).map_err(|e| bad(KEY_ADDRESS, e.to_string()))?;
    let timestamp = parse_legacy_time(field(KEY_TIME)?).map_err(|e| bad(KEY_TIME, e))?;

    let status_raw = field(KEY_STATUS)?;
    let status = PaymentStatus::from_label(status_raw)
        .ok_or_else(|| bad(KEY_STATUS, format!("unknown status '{}'", status_raw)))?;

    Ok(HarvestRecord {
        height,
        gross_amount,
        node_reward,
        kickback,
        harvester,
        timestamp,
        status,
    })
}

// Older logs hold float reprs, occasionally in exponent form
fn parse_decimal(raw: &str) -> std::result::Result<Decimal, String> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| e.to_string())
}

fn format_legacy_time(timestamp: &DateTime<Utc>) -> String {
    if timestamp.timestamp_subsec_micros() == 0 {
        timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

fn parse_legacy_time(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| e.to_string())
}
