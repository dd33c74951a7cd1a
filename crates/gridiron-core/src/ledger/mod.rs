//! Sync ledger — durable map of resource type → most recent run outcome.
//!
//! The whole ledger is one JSON document:
//!
//! ```json
//! { "players": { "timestamp": "2024-09-08T12:00:00Z", "status": "success" } }
//! ```
//!
//! [`SyncLedger::record_sync`] is a read-merge-write of that document: take the
//! writer lock, read the current document fresh from storage, replace one key,
//! write the full document back atomically. Keys other than the one being
//! recorded (including keys this binary does not know) are carried over
//! untouched, so concurrent jobs for different resources never erase each
//! other's entries.

mod storage;

pub use storage::{JsonFileStorage, MemoryLedgerStorage};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError};
use tokio::sync::Mutex;

use crate::types::SyncStatus;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger document is corrupt: {0}")]
    Corrupt(String),

    #[error("ledger serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("ledger task failed: {0}")]
    Task(String),
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// Persisted value under each resource key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub timestamp: DateTime<Utc>,
    pub status: SyncStatus,
}

/// One resource type's most recent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLedgerEntry {
    pub resource_type: String,
    pub timestamp: DateTime<Utc>,
    pub status: SyncStatus,
}

type Document = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Storage seam
// ---------------------------------------------------------------------------

/// Where the ledger document lives. `save` must replace the document
/// atomically: a concurrent `load` sees the old or the new bytes, never a mix.
#[async_trait::async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Current document bytes, or `None` if nothing was ever written.
    async fn load(&self) -> Result<Option<Vec<u8>>, LedgerError>;

    async fn save(&self, bytes: Vec<u8>) -> Result<(), LedgerError>;
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub struct SyncLedger {
    storage: Box<dyn LedgerStorage>,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for SyncLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncLedger").finish_non_exhaustive()
    }
}

impl SyncLedger {
    pub fn new(storage: impl LedgerStorage + 'static) -> Self {
        Self::with_lock(storage, Arc::default())
    }

    fn with_lock(storage: impl LedgerStorage + 'static, write_lock: Arc<Mutex<()>>) -> Self {
        Self {
            storage: Box::new(storage),
            write_lock,
        }
    }

    /// Ledger backed by a JSON file at `path`.
    ///
    /// Every ledger opened on the same path in this process shares one writer
    /// lock, so separately opened handles cannot lose each other's updates.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = path_lock(&path);
        Self::with_lock(JsonFileStorage::new(path), lock)
    }

    /// Ledger held only in memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryLedgerStorage::default())
    }

    /// Replace the entry for `resource_type`, keeping every other key.
    ///
    /// On error the persisted document is unchanged. A corrupt existing
    /// document is reported, never overwritten.
    pub async fn record_sync(
        &self,
        resource_type: impl AsRef<str>,
        status: SyncStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<SyncLedgerEntry, LedgerError> {
        let key = resource_type.as_ref().to_string();
        let record = LedgerRecord { timestamp, status };

        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_document().await?;
        doc.insert(key.clone(), serde_json::to_value(record)?);
        let bytes = serde_json::to_vec_pretty(&doc)?;
        self.storage.save(bytes).await?;

        tracing::debug!(resource = %key, %status, %timestamp, "ledger entry recorded");
        Ok(SyncLedgerEntry {
            resource_type: key,
            timestamp,
            status,
        })
    }

    /// Every entry in the ledger. Empty or absent storage yields an empty map.
    ///
    /// Individual entries that do not parse are logged and left out; the raw
    /// value stays on disk and is preserved by later writes.
    pub async fn read_all(&self) -> Result<BTreeMap<String, SyncLedgerEntry>, LedgerError> {
        let doc = self.load_document().await?;
        let mut out = BTreeMap::new();
        for (key, value) in doc {
            match serde_json::from_value::<LedgerRecord>(value) {
                Ok(record) => {
                    out.insert(
                        key.clone(),
                        SyncLedgerEntry {
                            resource_type: key,
                            timestamp: record.timestamp,
                            status: record.status,
                        },
                    );
                }
                Err(e) => tracing::warn!(resource = %key, error = %e, "skipping unreadable ledger entry"),
            }
        }
        Ok(out)
    }

    /// Entry for a single resource type.
    pub async fn entry(
        &self,
        resource_type: impl AsRef<str>,
    ) -> Result<Option<SyncLedgerEntry>, LedgerError> {
        Ok(self.read_all().await?.remove(resource_type.as_ref()))
    }

    async fn load_document(&self) -> Result<Document, LedgerError> {
        let Some(bytes) = self.storage.load().await? else {
            return Ok(Document::new());
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Document::new());
        }
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(serde_json::Value::Object(map)) => Ok(map.into_iter().collect()),
            Ok(other) => Err(LedgerError::Corrupt(format!(
                "expected a JSON object, found {}",
                json_type(&other)
            ))),
            Err(e) => Err(LedgerError::Corrupt(e.to_string())),
        }
    }
}

/// Process-wide writer lock for a ledger file.
fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(key).or_default())
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
