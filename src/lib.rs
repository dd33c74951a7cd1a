//! gridiron — NFL data sync.
//!
//! Pulls teams, players, games, per-game stats and advanced metrics from a
//! cursor-paginated sports-data provider, normalises each record, upserts it
//! by provider id, and records the outcome of every run in a sync ledger.
//!
//! # Architecture
//!
//! ```text
//! SyncScheduler ──► ResourceSyncJob ──► FeedClient ──► Normalizer ──► UpsertStore
//!                          │
//!                          └──► SyncLedger
//! ```
//!
//! One job per resource type; jobs for different types run concurrently,
//! each paginating strictly in order. The ledger is the only state those jobs
//! share.

pub mod job;
pub mod scheduler;

pub use job::{FailureBudget, JobConfig, JobResult, JobState, LedgerWrite, ResourceSyncJob};
pub use scheduler::{SchedulerError, SyncScheduler, MIN_INTERVAL};
