//! Storage layer: append-only ledger file
//!
//! # Layout
//!
//! - `<path>` - one record per line, see [`crate::format`]
//! - `<path>.lock` - advisory lock held for the lifetime of a [`LedgerStore`]
//!
//! # Durability
//!
//! Each append builds the complete line in memory, writes it with a single
//! `write_all` and calls `sync_data` before returning. A failed write is
//! truncated back to the previous length. A crash can still leave at most
//! one unterminated line, which `load` reports as a parse error instead of
//! silently moving the resume cursor.

use crate::{
    config::LedgerConfig,
    error::{Error, Result},
    format::{decode_line, encode_line},
    types::{HarvestRecord, PaymentStatus},
};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

/// State recovered from the ledger file
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    /// Highest height recorded, or the configured floor when empty
    pub resume_height: u64,

    /// All records keyed by height
    pub records: BTreeMap<u64, HarvestRecord>,
}

impl LedgerSnapshot {
    /// Records still owed a kickback
    pub fn unpaid(&self) -> impl Iterator<Item = &HarvestRecord> {
        self.records.values().filter(|r| r.is_unpaid())
    }

    /// Number of records with the given status
    pub fn count_status(&self, status: PaymentStatus) -> usize {
        self.records.values().filter(|r| r.status == status).count()
    }

    /// Whether no record has been written yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Append-only ledger file with an exclusive advisory lock
#[derive(Debug)]
pub struct LedgerStore {
    config: LedgerConfig,

    /// Held open to keep the lock
    lock: File,

    /// Highest height on disk, known after `load`
    last_height: Option<u64>,
}

impl LedgerStore {
    /// Open (creating if missing) and lock the ledger
    pub fn open(config: LedgerConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let lock_path = config.lock_path();
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        lock.try_lock_exclusive()
            .map_err(|_| Error::Locked(lock_path.display().to_string()))?;

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        tracing::info!(
            path = %config.path.display(),
            format = %config.format,
            "Opened harvest ledger"
        );

        Ok(Self {
            config,
            lock,
            last_height: None,
        })
    }

    /// Ledger file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Re-read the whole ledger and refresh the resume cursor
    pub fn load(&mut self) -> Result<LedgerSnapshot> {
        let mut content = Vec::new();
        File::open(&self.config.path)?.read_to_end(&mut content)?;

        let mut records = BTreeMap::new();
        let mut last: Option<u64> = None;

        for (idx, raw) in content.split_inclusive(|b| *b == b'\n').enumerate() {
            let line_no = idx + 1;

            let raw = raw
                .strip_suffix(b"\n")
                .ok_or_else(|| Error::parse(line_no, "unterminated line (truncated write?)"))?;
            let line = std::str::from_utf8(raw)
                .map_err(|e| Error::parse(line_no, format!("invalid UTF-8: {}", e)))?;

            if line.trim().is_empty() {
                continue;
            }

            let record = decode_line(line_no, line)?;

            if let Some(prev) = last {
                if record.height <= prev {
                    return Err(Error::parse(
                        line_no,
                        format!("height {} does not follow {}", record.height, prev),
                    ));
                }
            }

            last = Some(record.height);
            records.insert(record.height, record);
        }

        self.last_height = last;
        let resume_height = last.unwrap_or(self.config.height_floor);

        tracing::debug!(
            records = records.len(),
            resume_height,
            "Ledger loaded"
        );

        Ok(LedgerSnapshot {
            resume_height,
            records,
        })
    }

    /// Append one record, durably, before returning
    pub fn append(&mut self, record: &HarvestRecord) -> Result<()> {
        if self.last_height.is_none() {
            self.load()?;
        }

        if let Some(last) = self.last_height {
            if record.height <= last {
                return Err(Error::NonMonotonic {
                    height: record.height,
                    last,
                });
            }
        }

        let line = encode_line(record, self.config.format)?;

        let file = OpenOptions::new().append(true).open(&self.config.path)?;
        write_or_truncate(&file, &file, line.as_bytes())?;

        self.last_height = Some(record.height);

        tracing::debug!(
            height = record.height,
            status = %record.status,
            harvester = %record.harvester,
            "Record appended"
        );

        Ok(())
    }

    /// Highest height known on disk (after `load` or `append`)
    pub fn last_height(&self) -> Option<u64> {
        self.last_height
    }
}

/// Write `line` through `writer` and sync `file`, or cut `file` back to
/// its previous length so no fragment is left behind
fn write_or_truncate<W: Write>(file: &File, mut writer: W, line: &[u8]) -> io::Result<()> {
    let before = file.metadata()?.len();

    let result = writer
        .write_all(line)
        .and_then(|_| writer.flush())
        .and_then(|_| file.sync_data());

    if let Err(e) = result {
        if let Err(truncate_err) = file.set_len(before).and_then(|_| file.sync_data()) {
            tracing::error!(error = %truncate_err, "Failed to remove partial ledger line");
        }
        return Err(e);
    }

    Ok(())
}

impl Drop for LedgerStore {
    fn drop(&mut self) {
        let _ = self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::config::LedgerFormat;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn test_config(format: LedgerFormat) -> (LedgerConfig, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = LedgerConfig {
            path: temp_dir.path().join("ledger").join("harvested.txt"),
            format,
            height_floor: 0,
        };
        (config, temp_dir)
    }

    fn test_record(height: u64) -> HarvestRecord {
        HarvestRecord {
            height,
            gross_amount: 134_422_724,
            node_reward: 48_008_115,
            kickback: Some(dec!(9.601623)),
            harvester: Address::from_bytes(&[0x68; 24]),
            timestamp: Utc.with_ymd_and_hms(2021, 8, 29, 11, 5, 34).unwrap(),
            status: PaymentStatus::Unpaid,
        }
    }

    #[test]
    fn test_open_creates_empty_ledger() {
        let (mut config, _temp) = test_config(LedgerFormat::V1);
        config.height_floor = 250_000;

        let mut store = LedgerStore::open(config.clone()).unwrap();
        assert!(config.path.exists());

        let snapshot = store.load().unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.resume_height, 250_000);
        assert_eq!(store.last_height(), None);
    }

    #[test]
    fn test_append_and_load() {
        for format in [LedgerFormat::V1, LedgerFormat::Legacy] {
            let (config, _temp) = test_config(format);
            let mut store = LedgerStore::open(config).unwrap();

            store.append(&test_record(10)).unwrap();
            store.append(&test_record(12)).unwrap();

            let snapshot = store.load().unwrap();
            assert_eq!(snapshot.resume_height, 12);
            assert_eq!(snapshot.records.len(), 2);
            assert_eq!(snapshot.records[&10], test_record(10));
        }
    }

    #[test]
    fn test_append_rejects_non_monotonic_height() {
        let (config, _temp) = test_config(LedgerFormat::V1);
        let mut store = LedgerStore::open(config).unwrap();

        store.append(&test_record(10)).unwrap();
        let err = store.append(&test_record(10)).unwrap_err();
        assert!(matches!(err, Error::NonMonotonic { height: 10, last: 10 }));

        let err = store.append(&test_record(9)).unwrap_err();
        assert!(matches!(err, Error::NonMonotonic { height: 9, last: 10 }));
        assert_eq!(store.load().unwrap().records.len(), 1);
    }

    #[test]
    fn test_truncated_last_line_is_parse_error() {
        let (config, _temp) = test_config(LedgerFormat::Legacy);
        let mut store = LedgerStore::open(config.clone()).unwrap();
        store.append(&test_record(10)).unwrap();

        let mut file = OpenOptions::new().append(true).open(&config.path).unwrap();
        file.write_all(b"height,11,harvestAmount,13442").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_crash_after_append_resumes_from_last_record() {
        let (config, _temp) = test_config(LedgerFormat::V1);
        {
            let mut store = LedgerStore::open(config.clone()).unwrap();
            store.append(&test_record(10)).unwrap();
            store.append(&test_record(11)).unwrap();
            // dropped without any shutdown step
        }

        let mut store = LedgerStore::open(config).unwrap();
        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.resume_height, 11);

        store.append(&test_record(12)).unwrap();
        assert_eq!(store.load().unwrap().records.len(), 3);
    }

    #[test]
    fn test_mixed_formats_and_external_status_edit() {
        let (mut config, _temp) = test_config(LedgerFormat::Legacy);
        {
            let mut store = LedgerStore::open(config.clone()).unwrap();
            store.append(&test_record(10)).unwrap();
        }

        config.format = LedgerFormat::V1;
        let mut store = LedgerStore::open(config.clone()).unwrap();
        store.append(&test_record(11)).unwrap();

        // Operator marks the legacy line as paid by hand
        let content = std::fs::read_to_string(&config.path).unwrap();
        std::fs::write(&config.path, content.replacen("Status,Unpaid,", "Status,PAID,", 1))
            .unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.records[&10].status, PaymentStatus::Paid);
        assert_eq!(snapshot.records[&11].status, PaymentStatus::Unpaid);
        assert_eq!(snapshot.unpaid().count(), 1);
    }

    /// Accepts `limit` bytes, then fails like a full disk
    struct TornWriter<'a> {
        file: &'a File,
        limit: usize,
    }

    impl Write for TornWriter<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.limit == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            let n = buf.len().min(self.limit);
            self.limit -= n;
            self.file.write(&buf[..n])
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_leaves_no_fragment() {
        let (config, _temp) = test_config(LedgerFormat::Legacy);
        let mut store = LedgerStore::open(config.clone()).unwrap();
        store.append(&test_record(10)).unwrap();
        let before = std::fs::read(&config.path).unwrap();

        let file = OpenOptions::new().append(true).open(&config.path).unwrap();
        let line = encode_line(&test_record(11), LedgerFormat::Legacy).unwrap();
        let writer = TornWriter {
            file: &file,
            limit: 17,
        };
        assert!(write_or_truncate(&file, writer, line.as_bytes()).is_err());
        assert_eq!(std::fs::read(&config.path).unwrap(), before);

        // Next append lands on a clean line boundary
        store.append(&test_record(11)).unwrap();
        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.records.keys().copied().collect::<Vec<_>>(), vec![10, 11]);
    }

    #[test]
    fn test_invalid_utf8_names_the_line() {
        let (config, _temp) = test_config(LedgerFormat::Legacy);
        let mut store = LedgerStore::open(config.clone()).unwrap();
        store.append(&test_record(10)).unwrap();

        let mut file = OpenOptions::new().append(true).open(&config.path).unwrap();
        file.write_all(b"height,11,Status,\xFF\xFEUnpaid,\n").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_out_of_order_file_is_parse_error() {
        let (config, _temp) = test_config(LedgerFormat::V1);
        let mut store = LedgerStore::open(config.clone()).unwrap();

        let mut content = encode_line(&test_record(20), LedgerFormat::V1).unwrap();
        content.push_str(&encode_line(&test_record(15), LedgerFormat::V1).unwrap());
        std::fs::write(&config.path, content).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_second_open_is_locked() {
        let (config, _temp) = test_config(LedgerFormat::V1);
        let _store = LedgerStore::open(config.clone()).unwrap();

        let err = LedgerStore::open(config).unwrap_err();
        assert!(matches!(err, Error::Locked(_)));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let (config, _temp) = test_config(LedgerFormat::V1);
        drop(LedgerStore::open(config.clone()).unwrap());
        assert!(LedgerStore::open(config).is_ok());
    }
}
