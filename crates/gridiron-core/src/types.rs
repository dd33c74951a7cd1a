//! Core types for gridiron-core.
//!
//! This module defines the vocabulary shared across all pipeline stages: the
//! [`ResourceType`] a sync job runs for, the [`EntityKind`] a canonical record
//! belongs to, the transient [`ExternalRecord`] and [`PageCursor`] produced by
//! the feed, and the [`SyncStatus`] written to the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Provider-assigned numeric identifier. The only identity key used for
/// upsert matching; storage ids are never compared against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(pub i64);

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Resource types and entity kinds
// ---------------------------------------------------------------------------

/// A provider collection that one sync job paginates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Teams,
    Players,
    Games,
    Stats,
    AdvancedMetrics,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Teams,
        ResourceType::Players,
        ResourceType::Games,
        ResourceType::Stats,
        ResourceType::AdvancedMetrics,
    ];

    /// Ledger key and config name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Teams => "teams",
            ResourceType::Players => "players",
            ResourceType::Games => "games",
            ResourceType::Stats => "stats",
            ResourceType::AdvancedMetrics => "advanced_metrics",
        }
    }

    /// Provider path segment used when no override is configured.
    pub fn default_path(self) -> &'static str {
        match self {
            ResourceType::AdvancedMetrics => "advanced_stats",
            other => other.as_str(),
        }
    }

    /// Entity kind that records of this resource normalise into.
    pub fn entity_kind(self) -> EntityKind {
        match self {
            ResourceType::Teams => EntityKind::Team,
            ResourceType::Players => EntityKind::Player,
            ResourceType::Games => EntityKind::Matchup,
            ResourceType::Stats => EntityKind::PlayerStats,
            ResourceType::AdvancedMetrics => EntityKind::PlayerAdvancedMetrics,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ResourceType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Returned when a string names no known resource type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type: {0:?}")]
pub struct UnknownResourceType(pub String);

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownResourceType(s.to_string()))
    }
}

/// Which canonical collection an entity lives in. Upsert identity is the pair
/// `(EntityKind, ExternalId)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Team,
    Player,
    PlayerStats,
    Matchup,
    PlayerAdvancedMetrics,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Team,
        EntityKind::Player,
        EntityKind::PlayerStats,
        EntityKind::Matchup,
        EntityKind::PlayerAdvancedMetrics,
    ];

    /// Directory / collection name.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Team => "team",
            EntityKind::Player => "player",
            EntityKind::PlayerStats => "player_stats",
            EntityKind::Matchup => "matchup",
            EntityKind::PlayerAdvancedMetrics => "player_advanced_metrics",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Feed payloads
// ---------------------------------------------------------------------------

/// One raw record as returned by the provider. Transient: produced per page
/// and handed straight to the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalRecord(pub serde_json::Value);

impl ExternalRecord {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Top-level field lookup; `None` for non-object payloads.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.as_object().and_then(|o| o.get(key))
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for ExternalRecord {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Opaque pagination token. Providers send it as either a string or a number;
/// both are kept as their textual form and echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PageCursor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(PageCursor(s)),
            serde_json::Value::Number(n) => Ok(PageCursor(n.to_string())),
            other => Err(D::Error::custom(format!(
                "cursor must be a string or number, got {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync status
// ---------------------------------------------------------------------------

/// Outcome recorded in the ledger at the end of every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Partial,
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Partial => write!(f, "partial"),
            SyncStatus::Error => write!(f, "error"),
        }
    }
}
