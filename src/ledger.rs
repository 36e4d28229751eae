//! Deduplication ledger
//!
//! Durable record of which batches have already been merged into the
//! aggregates, keyed by `BatchFingerprint`. The whole ledger is rewritten on
//! every `mark_processed` (to a temp file renamed into place).
//!
//! Lifecycle per batch: absent → present. There is no in-progress state: a
//! crash mid-batch leaves it absent and the next run reprocesses it.
//!
//! File format (compatible with ledgers written by earlier tooling):
//! ```json
//! {
//!   "<md5 fingerprint>": {
//!     "remote_path": "v3/2025/04/26/csv/20250426-Field-1.csv",
//!     "file_size": 81234,
//!     "last_modified": "Apr 26 21:14",
//!     "processed_at": "2025-04-27T03:00:00+00:00",
//!     "stats_summary": { "batters": 18, "pitchers": 9, "pitches": 9, "players": 27 }
//!   }
//! }
//! ```

use crate::batch::{BatchDescriptor, BatchFingerprint};
use crate::pipeline::types::DomainSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "remote_path")]
    pub path: String,
    #[serde(rename = "file_size")]
    pub size: Option<u64>,
    pub last_modified: Option<String>,
    /// RFC 3339 completion timestamp
    pub processed_at: String,
    #[serde(rename = "stats_summary", default)]
    pub summary: DomainSummary,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to write ledger {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

type Entries = BTreeMap<BatchFingerprint, LedgerEntry>;

pub struct Ledger {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl Ledger {
    /// Load the ledger at `path`
    ///
    /// A missing file starts an empty ledger. An unreadable or corrupt file
    /// also starts empty (every batch will be reprocessed) and is logged.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_processed(&self, descriptor: &BatchDescriptor) -> bool {
        self.lock().contains_key(&descriptor.fingerprint())
    }

    /// Record a completed batch and persist the ledger
    ///
    /// The in-memory entry is kept even when the write fails, so the rest of
    /// the run treats the batch as done; the next run will not see it and
    /// reprocesses it.
    pub fn mark_processed(
        &self,
        descriptor: &BatchDescriptor,
        summary: DomainSummary,
    ) -> Result<(), LedgerError> {
        let entry = LedgerEntry {
            path: descriptor.path.clone(),
            size: Some(descriptor.size),
            last_modified: Some(descriptor.last_modified.clone()),
            processed_at: chrono::Utc::now().to_rfc3339(),
            summary,
        };

        // Serialize and write while holding the lock so concurrent callers
        // can't interleave stale snapshots on disk.
        let mut entries = self.lock();
        entries.insert(descriptor.fingerprint(), entry);
        self.persist(&entries)
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn entry(&self, fingerprint: &BatchFingerprint) -> Option<LedgerEntry> {
        self.lock().get(fingerprint).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &Entries) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(entries)?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let io_err = |source| LedgerError::Io {
            path: self.path.clone(),
            source,
        };
        fs::write(&tmp_path, json).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        log::debug!("Saved {} ledger entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

fn load_entries(path: &Path) -> Entries {
    if !path.exists() {
        log::info!("No existing ledger found at {}, starting empty", path.display());
        return Entries::new();
    }

    let loaded = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| serde_json::from_str::<Entries>(&json).map_err(|e| e.to_string()));

    match loaded {
        Ok(entries) => {
            log::info!("📒 Loaded {} ledger entries from {}", entries.len(), path.display());
            entries
        }
        Err(e) => {
            log::warn!(
                "⚠️  Could not load ledger {} ({}); every batch will be reprocessed",
                path.display(),
                e
            );
            Entries::new()
        }
    }
}
