//! Store — canonical entities keyed by `(EntityKind, ExternalId)`.
//!
//! [`UpsertStore`] is the only write path. [`EntityReader`] is the read-only
//! surface handed to presentation code. Two backends ship: [`MemoryStore`]
//! and the durable [`FileStore`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::entity::CanonicalEntity;
use crate::types::{EntityKind, ExternalId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("corrupt record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store task failed: {0}")]
    Task(String),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An entity as persisted, with store-owned bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    /// Internal storage id. Never used for upsert matching.
    pub id: Uuid,
    pub entity: CanonicalEntity,
    pub created_at: DateTime<Utc>,
    /// Moves only when the stored content actually changes.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsertOutcome {
    pub created: bool,
    pub changed: bool,
}

/// Merge `entity` into whatever is currently stored under its key.
///
/// Returns the record to persist (`None` when nothing changed) and the
/// outcome. Storage id and `created_at` survive updates.
pub(crate) fn merge(
    existing: Option<&StoredEntity>,
    entity: CanonicalEntity,
    now: DateTime<Utc>,
) -> (Option<StoredEntity>, UpsertOutcome) {
    match existing {
        None => (
            Some(StoredEntity {
                id: Uuid::new_v4(),
                entity,
                created_at: now,
                updated_at: now,
            }),
            UpsertOutcome {
                created: true,
                changed: true,
            },
        ),
        Some(current) if current.entity == entity => (None, UpsertOutcome::default()),
        Some(current) => (
            Some(StoredEntity {
                id: current.id,
                entity,
                created_at: current.created_at,
                updated_at: now,
            }),
            UpsertOutcome {
                created: false,
                changed: true,
            },
        ),
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Read-side filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityQuery {
    pub team_id: Option<i64>,
    pub season: Option<i32>,
    pub week: Option<i32>,
}

impl EntityQuery {
    pub fn team(mut self, team_id: i64) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn season(mut self, season: i32) -> Self {
        self.season = Some(season);
        self
    }

    pub fn week(mut self, week: i32) -> Self {
        self.week = Some(week);
        self
    }

    pub fn matches(&self, entity: &CanonicalEntity) -> bool {
        if let Some(team) = self.team_id {
            if !entity.team_ids().contains(&team) {
                return false;
            }
        }
        if self.season.is_some() && entity.season() != self.season {
            return false;
        }
        if self.week.is_some() && entity.week() != self.week {
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Write path used by sync jobs.
#[async_trait::async_trait]
pub trait UpsertStore: Send + Sync {
    /// Insert if `(kind, external_id)` is absent, otherwise update in place.
    async fn upsert(&self, entity: CanonicalEntity) -> Result<UpsertOutcome, StoreError>;
}

/// Read-only access for presentation code.
#[async_trait::async_trait]
pub trait EntityReader: Send + Sync {
    async fn get(
        &self,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Result<Option<StoredEntity>, StoreError>;

    /// Entities of `kind` matching `query`, ordered by external id.
    async fn query(
        &self,
        kind: EntityKind,
        query: &EntityQuery,
    ) -> Result<Vec<StoredEntity>, StoreError>;
}
