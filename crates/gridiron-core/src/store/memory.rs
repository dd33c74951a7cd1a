use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{merge, EntityQuery, EntityReader, StoreError, StoredEntity, UpsertOutcome, UpsertStore};
use crate::entity::CanonicalEntity;
use crate::types::{EntityKind, ExternalId};

/// In-process store. Not durable; used by tests and embedders that persist
/// elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(EntityKind, ExternalId), StoredEntity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Number of records of one kind.
    pub async fn count(&self, kind: EntityKind) -> usize {
        self.records
            .read()
            .await
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

#[async_trait::async_trait]
impl UpsertStore for MemoryStore {
    async fn upsert(&self, entity: CanonicalEntity) -> Result<UpsertOutcome, StoreError> {
        let key = (entity.kind(), entity.external_id);
        let mut records = self.records.write().await;
        let (next, outcome) = merge(records.get(&key), entity, Utc::now());
        if let Some(record) = next {
            records.insert(key, record);
        }
        Ok(outcome)
    }
}

#[async_trait::async_trait]
impl EntityReader for MemoryStore {
    async fn get(
        &self,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Result<Option<StoredEntity>, StoreError> {
        Ok(self.records.read().await.get(&(kind, external_id)).cloned())
    }

    async fn query(
        &self,
        kind: EntityKind,
        query: &EntityQuery,
    ) -> Result<Vec<StoredEntity>, StoreError> {
        let records = self.records.read().await;
        let mut out: Vec<StoredEntity> = records
            .iter()
            .filter(|((k, _), r)| *k == kind && query.matches(&r.entity))
            .map(|(_, r)| r.clone())
            .collect();
        out.sort_by_key(|r| r.entity.external_id);
        Ok(out)
    }
}
