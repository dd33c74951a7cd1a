use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{LedgerError, LedgerStorage};
use crate::persist::{read_optional, write_atomic};

/// Ledger document on the local filesystem, replaced via temp file + rename.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl LedgerStorage for JsonFileStorage {
    async fn load(&self) -> Result<Option<Vec<u8>>, LedgerError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_optional(&path))
            .await
            .map_err(|e| LedgerError::Task(e.to_string()))?
            .map_err(Into::into)
    }

    async fn save(&self, bytes: Vec<u8>) -> Result<(), LedgerError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| LedgerError::Task(e.to_string()))?
            .map_err(Into::into)
    }
}

/// In-memory document. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStorage {
    bytes: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryLedgerStorage {
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(Some(bytes))),
        }
    }

    /// Current document bytes.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.bytes.lock().ok().and_then(|b| b.clone())
    }
}

#[async_trait::async_trait]
impl LedgerStorage for MemoryLedgerStorage {
    async fn load(&self) -> Result<Option<Vec<u8>>, LedgerError> {
        let guard = self
            .bytes
            .lock()
            .map_err(|_| LedgerError::Task("ledger buffer lock poisoned".into()))?;
        Ok(guard.clone())
    }

    async fn save(&self, bytes: Vec<u8>) -> Result<(), LedgerError> {
        let mut guard = self
            .bytes
            .lock()
            .map_err(|_| LedgerError::Task("ledger buffer lock poisoned".into()))?;
        *guard = Some(bytes);
        Ok(())
    }
}
