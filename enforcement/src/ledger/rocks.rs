//! RocksDB-backed ledger
//!
//! Entries live in the `ledger` column family under
//! `entry:{dispute_id}:{seq:020}` so a prefix scan returns them in order.
//! Each batch is a single synchronous `WriteBatch`.

use crate::ledger::backend::{check_batch, LedgerBackend};
use crate::ledger::types::{LedgerEntry, LedgerError, LedgerResult};
use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, WriteOptions, DB};
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

/// Column family for ledger entries
pub const CF_LEDGER: &str = "ledger";

pub mod keys {
    /// Prefix shared by all entries of one dispute
    pub fn prefix(dispute_id: &str) -> String {
        format!("entry:{}:", dispute_id)
    }

    /// Create an entry key
    pub fn entry(dispute_id: &str, seq: u64) -> String {
        format!("entry:{}:{:020}", dispute_id, seq)
    }

    /// Sequence number of a key under `prefix`, if it belongs to that dispute
    pub fn parse_seq(prefix: &str, key: &str) -> Option<u64> {
        let rest = key.strip_prefix(prefix)?;
        if rest.len() == 20 && rest.bytes().all(|b| b.is_ascii_digit()) {
            rest.parse().ok()
        } else {
            None
        }
    }
}

pub struct RocksLedger {
    db: RwLock<DB>,
    path: PathBuf,
    /// Serializes read-check-write of appends
    append_lock: Mutex<()>,
}

impl std::fmt::Debug for RocksLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksLedger").field("path", &self.path).finish()
    }
}

impl RocksLedger {
    /// Open or create a ledger database at the given path
    pub fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let path = path.into();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(CF_LEDGER, Options::default())];
        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)?;

        Ok(Self {
            db: RwLock::new(db),
            path,
            append_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl LedgerBackend for RocksLedger {
    fn append_batch(&self, dispute_id: &str, entries: &[LedgerEntry]) -> LedgerResult<()> {
        let _guard = self.append_lock.lock().map_err(|_| LedgerError::LockPoisoned)?;

        let head = self.head(dispute_id)?;
        check_batch(dispute_id, head, entries)?;

        let db = self.db.read().map_err(|_| LedgerError::LockPoisoned)?;
        let cf = db
            .cf_handle(CF_LEDGER)
            .ok_or_else(|| LedgerError::ColumnFamilyNotFound(CF_LEDGER.to_string()))?;

        let mut batch = WriteBatch::default();
        for entry in entries {
            let key = keys::entry(dispute_id, entry.seq);
            batch.put_cf(&cf, key.as_bytes(), serde_json::to_vec(entry)?);
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        db.write_opt(batch, &write_opts)?;
        Ok(())
    }

    fn read(&self, dispute_id: &str) -> LedgerResult<Vec<LedgerEntry>> {
        let db = self.db.read().map_err(|_| LedgerError::LockPoisoned)?;
        let cf = db
            .cf_handle(CF_LEDGER)
            .ok_or_else(|| LedgerError::ColumnFamilyNotFound(CF_LEDGER.to_string()))?;

        let prefix = keys::prefix(dispute_id);
        let mut entries = Vec::new();
        for result in db.prefix_iterator_cf(&cf, prefix.as_bytes()) {
            let (key, value) = result?;
            let key_str = String::from_utf8_lossy(&key);
            if !key_str.starts_with(&prefix) {
                break; // Prefix no longer matches
            }
            // Skip ids that merely share this prefix (e.g. "a" vs "a:b")
            if keys::parse_seq(&prefix, &key_str).is_none() {
                continue;
            }
            entries.push(serde_json::from_slice(&value).map_err(|e| LedgerError::Corrupt {
                dispute_id: dispute_id.to_string(),
                message: e.to_string(),
            })?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::backend::tests::{note, unpaired_batches};

    #[test]
    fn test_keys_order_and_parse() {
        let prefix = keys::prefix("d-1");
        assert!(keys::entry("d-1", 2) < keys::entry("d-1", 10));
        assert_eq!(keys::parse_seq(&prefix, &keys::entry("d-1", 42)), Some(42));
        assert_eq!(keys::parse_seq(&prefix, &keys::entry("d-1:x", 1)), None);
    }

    #[test]
    fn test_rocks_append_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = RocksLedger::open(dir.path()).unwrap();
            ledger
                .append_batch("d-1", &[note(1, "d-1"), note(2, "d-1")])
                .unwrap();
            ledger.append_batch("d-1:x", &[note(1, "d-1:x")]).unwrap();
        }

        let ledger = RocksLedger::open(dir.path()).unwrap();
        assert_eq!(ledger.read("d-1").unwrap().len(), 2);
        assert_eq!(ledger.head("d-1").unwrap(), 2);
        assert!(matches!(
            ledger.append_batch("d-1", &[note(2, "d-1")]),
            Err(LedgerError::SequenceConflict { .. })
        ));
    }

    #[test]
    fn test_rocks_refuses_unpaired_evaluations() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = RocksLedger::open(dir.path()).unwrap();
        ledger.append_batch("d-1", &[note(1, "d-1")]).unwrap();

        for batch in unpaired_batches("d-1", 1) {
            assert!(matches!(
                ledger.append_batch("d-1", &batch),
                Err(LedgerError::UnpairedEvaluation { .. })
            ));
        }
        assert_eq!(ledger.read("d-1").unwrap().len(), 1);
    }
}
