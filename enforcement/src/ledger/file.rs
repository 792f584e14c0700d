//! JSON-lines ledger, one file per dispute
//!
//! Each line holds one atomic batch as a JSON array. A line only counts once
//! its trailing newline is on disk, so a crash mid-write leaves a torn tail
//! that readers skip and the next append truncates.

use crate::ledger::backend::{check_batch, LedgerBackend};
use crate::ledger::types::{LedgerEntry, LedgerError, LedgerResult};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Number of write-lock stripes; disputes hashing to one stripe share it
const LOCK_STRIPES: usize = 64;

#[derive(Debug)]
pub struct FileLedger {
    dir: PathBuf,
    /// Striped write locks, fixed in size however many disputes are written
    stripes: Vec<Mutex<()>>,
}

impl FileLedger {
    /// Open (creating if needed) a ledger directory
    pub fn open(dir: impl Into<PathBuf>) -> LedgerResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a dispute's history
    pub fn path_for(&self, dispute_id: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", file_stem(dispute_id)))
    }

    /// Dispute ids with a ledger file in this directory
    pub fn dispute_ids(&self) -> LedgerResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_stem)
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn stripe_for(&self, dispute_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        dispute_id.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    /// Complete batches and the byte length they occupy
    fn load(&self, dispute_id: &str) -> LedgerResult<(Vec<LedgerEntry>, u64)> {
        let path = self.path_for(dispute_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        let mut valid_len = 0usize;
        let mut start = 0usize;
        while let Some(offset) = bytes[start..].iter().position(|b| *b == b'\n') {
            let line = &bytes[start..start + offset];
            if !line.iter().all(u8::is_ascii_whitespace) {
                let batch: Vec<LedgerEntry> =
                    serde_json::from_slice(line).map_err(|e| LedgerError::Corrupt {
                        dispute_id: dispute_id.to_string(),
                        message: format!("line at byte {}: {}", start, e),
                    })?;
                entries.extend(batch);
            }
            start += offset + 1;
            valid_len = start;
        }

        if valid_len < bytes.len() {
            tracing::warn!(
                dispute_id = %dispute_id,
                torn_bytes = bytes.len() - valid_len,
                "Ignoring torn trailing ledger line"
            );
        }
        Ok((entries, valid_len as u64))
    }
}

impl LedgerBackend for FileLedger {
    fn append_batch(&self, dispute_id: &str, entries: &[LedgerEntry]) -> LedgerResult<()> {
        let _guard = self.stripes[self.stripe_for(dispute_id)]
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)?;

        let (existing, valid_len) = self.load(dispute_id)?;
        let head = existing.last().map_or(0, |entry| entry.seq);
        check_batch(dispute_id, head, entries)?;

        let mut line = serde_json::to_vec(entries)?;
        line.push(b'\n');

        let path = self.path_for(dispute_id);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        if file.metadata()?.len() > valid_len {
            file.set_len(valid_len)?;
        }
        file.write_all(&line)?;
        file.sync_all()?;

        // First batch: the new directory entry must be durable as well
        if head == 0 {
            sync_dir(&self.dir)?;
        }
        Ok(())
    }

    fn read(&self, dispute_id: &str) -> LedgerResult<Vec<LedgerEntry>> {
        Ok(self.load(dispute_id)?.0)
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

// Directory handles cannot be fsynced here; file metadata is flushed with the file
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Filesystem-safe, reversible encoding of a dispute id
fn file_stem(dispute_id: &str) -> String {
    let mut stem = String::with_capacity(dispute_id.len());
    for byte in dispute_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    stem
}

fn decode_stem(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
