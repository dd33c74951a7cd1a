//! gridiron-core — core library for the gridiron NFL data sync.
//!
//! This crate holds the pipeline stages that do not talk to the network,
//! plus the types shared by all of them.
//!
//! # Architecture
//!
//! ```text
//! Feed (gridiron-feeds) ──► Normalizer ──► Store
//!                                            │
//!                    job outcome ──► SyncLedger
//! ```
//!
//! Sync jobs (in the `gridiron` crate) drive the feed page by page, run each
//! record through [`normalizer::normalize`], upsert the result, and finish by
//! writing one [`ledger::SyncLedger`] entry.

pub mod config;
pub mod entity;
pub mod ledger;
pub mod normalizer;
pub mod persist;
pub mod store;
pub mod types;

pub use entity::{
    CanonicalEntity, EntityData, Matchup, Player, PlayerAdvancedMetrics, PlayerStats, RawPayload,
    Team,
};
pub use ledger::{LedgerError, SyncLedger, SyncLedgerEntry};
pub use normalizer::{normalize, Normalized, SkipReason};
pub use store::{EntityQuery, EntityReader, StoreError, StoredEntity, UpsertOutcome, UpsertStore};
pub use types::{EntityKind, ExternalId, ExternalRecord, PageCursor, ResourceType, SyncStatus};
