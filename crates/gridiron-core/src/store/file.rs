use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{merge, EntityQuery, EntityReader, StoreError, StoredEntity, UpsertOutcome, UpsertStore};
use crate::entity::CanonicalEntity;
use crate::persist::{read_optional, write_atomic};
use crate::types::{EntityKind, ExternalId};

/// Durable store: one JSON document per entity at
/// `{root}/{kind}/{external_id}.json`.
///
/// Each write is a temp-file-and-rename, so a crash mid-run leaves every
/// record either at its previous or its new content. Writers of the same
/// kind are serialized; different kinds never contend.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: Arc<PathBuf>,
    locks: Arc<HashMap<EntityKind, Mutex<()>>>,
}

impl FileStore {
    /// Open (or lazily create) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let locks = EntityKind::ALL
            .into_iter()
            .map(|k| (k, Mutex::new(())))
            .collect();
        Self {
            root: Arc::new(root.into()),
            locks: Arc::new(locks),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, kind: EntityKind, id: ExternalId) -> PathBuf {
        self.root.join(kind.as_str()).join(format!("{id}.json"))
    }
}

fn load(path: &Path) -> Result<Option<StoredEntity>, StoreError> {
    match read_optional(path)? {
        None => Ok(None),
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            }),
    }
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

#[async_trait::async_trait]
impl UpsertStore for FileStore {
    async fn upsert(&self, entity: CanonicalEntity) -> Result<UpsertOutcome, StoreError> {
        let kind = entity.kind();
        let path = self.record_path(kind, entity.external_id);
        let _guard = match self.locks.get(&kind) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        blocking(move || {
            let existing = load(&path)?;
            let (next, outcome) = merge(existing.as_ref(), entity, Utc::now());
            if let Some(record) = next {
                let bytes = serde_json::to_vec_pretty(&record).map_err(|source| {
                    StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    }
                })?;
                write_atomic(&path, &bytes)?;
            }
            Ok(outcome)
        })
        .await
    }
}

#[async_trait::async_trait]
impl EntityReader for FileStore {
    async fn get(
        &self,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Result<Option<StoredEntity>, StoreError> {
        let path = self.record_path(kind, external_id);
        blocking(move || load(&path)).await
    }

    async fn query(
        &self,
        kind: EntityKind,
        query: &EntityQuery,
    ) -> Result<Vec<StoredEntity>, StoreError> {
        let dir = self.root.join(kind.as_str());
        let query = query.clone();

        blocking(move || {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut out = Vec::new();
            for entry in entries {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(record) = load(&path)? {
                    if query.matches(&record.entity) {
                        out.push(record);
                    }
                }
            }
            out.sort_by_key(|r| r.entity.external_id);
            Ok(out)
        })
        .await
    }
}
