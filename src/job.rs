//! ResourceSyncJob — one full sync run for one resource type.
//!
//! ```text
//! Idle ──► Running ──┬──► Completed   (feed exhausted; success | partial)
//!                    ├──► Failed      (feed error → error; failure budget → partial)
//!                    └──► Cancelled   (token fired between pages → partial)
//! ```
//!
//! Pages are fetched strictly in sequence: page N+1 needs the cursor page N
//! returned. Per-record problems (skips, store failures) are absorbed and
//! counted; only feed errors end the run early, plus the failure budget.
//! Every run ends with exactly one ledger write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gridiron_core::config::SyncConfig;
use gridiron_core::{
    normalize, Normalized, PageCursor, ResourceType, SyncLedger, SyncStatus, UpsertStore,
};
use gridiron_feeds::FeedClient;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// When a run gives up on store failures.
///
/// The budget is exceeded once `failures > ceiling`, or once at least
/// `min_sample` upserts were attempted and `failures / attempted > ratio`.
/// Skipped records are not upsert attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureBudget {
    pub ceiling: usize,
    pub ratio: f64,
    pub min_sample: usize,
}

impl Default for FailureBudget {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for FailureBudget {
    fn from(cfg: &SyncConfig) -> Self {
        Self {
            ceiling: cfg.failure_ceiling,
            ratio: cfg.failure_ratio,
            min_sample: cfg.failure_min_sample,
        }
    }
}

impl FailureBudget {
    pub fn exceeded(&self, failures: usize, attempted: usize) -> bool {
        if failures > self.ceiling {
            return true;
        }
        attempted > 0
            && attempted >= self.min_sample
            && (failures as f64 / attempted as f64) > self.ratio
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobConfig {
    /// Requested `per_page`; the feed client applies its default when unset.
    pub page_size: Option<u32>,
    pub failure_budget: FailureBudget,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Idle => write!(f, "idle"),
            JobState::Running => write!(f, "running"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
            JobState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Whether the final ledger entry made it to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "lowercase")]
pub enum LedgerWrite {
    Recorded,
    /// The persisted ledger still holds its previous value for this resource.
    Failed(String),
}

/// Structured summary handed back to the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub resource: ResourceType,
    pub state: JobState,
    pub status: SyncStatus,
    pub pages: usize,
    pub records_seen: usize,
    pub upserted: usize,
    pub created: usize,
    pub skipped: usize,
    pub failures: usize,
    pub feed_error: Option<String>,
    pub ledger: LedgerWrite,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobResult {
    pub fn ledger_failed(&self) -> bool {
        matches!(self.ledger, LedgerWrite::Failed(_))
    }
}

#[derive(Debug, Default)]
struct Counters {
    pages: usize,
    records_seen: usize,
    upserted: usize,
    created: usize,
    skipped: usize,
    failures: usize,
}

impl Counters {
    fn attempted(&self) -> usize {
        self.upserted + self.failures
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

pub struct ResourceSyncJob {
    resource: ResourceType,
    feed: Arc<dyn FeedClient>,
    store: Arc<dyn UpsertStore>,
    ledger: Arc<SyncLedger>,
    config: JobConfig,
    cancel: CancellationToken,
    state: JobState,
}

impl ResourceSyncJob {
    pub fn new(
        resource: ResourceType,
        feed: Arc<dyn FeedClient>,
        store: Arc<dyn UpsertStore>,
        ledger: Arc<SyncLedger>,
        config: JobConfig,
    ) -> Self {
        Self {
            resource,
            feed,
            store,
            ledger,
            config,
            cancel: CancellationToken::new(),
            state: JobState::Idle,
        }
    }

    /// Stop after the page in flight when `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn resource(&self) -> ResourceType {
        self.resource
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn transition(&mut self, to: JobState) {
        tracing::debug!(resource = %self.resource, from = %self.state, %to, "job state");
        self.state = to;
    }

    /// Run to completion. Never panics on feed, store or ledger errors; they
    /// are all reported through the returned [`JobResult`].
    pub async fn run(mut self) -> JobResult {
        let resource = self.resource;
        let started_at = Utc::now();
        self.transition(JobState::Running);
        tracing::info!(%resource, "sync started");

        let mut counters = Counters::default();
        let mut cursor: Option<PageCursor> = None;
        let mut feed_error = None;

        let (state, status) = loop {
            if self.cancel.is_cancelled() {
                tracing::warn!(%resource, pages = counters.pages, "sync cancelled between pages");
                break (JobState::Cancelled, SyncStatus::Partial);
            }

            let page = match self
                .feed
                .fetch_page(resource, cursor.as_ref(), self.config.page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(%resource, error = %e, "feed failed, aborting run");
                    feed_error = Some(e.to_string());
                    break (JobState::Failed, SyncStatus::Error);
                }
            };

            counters.pages += 1;
            counters.records_seen += page.records.len();
            self.process_page(page.records, &mut counters).await;
            cursor = page.next_cursor;

            if self
                .config
                .failure_budget
                .exceeded(counters.failures, counters.attempted())
            {
                tracing::error!(
                    %resource,
                    failures = counters.failures,
                    attempted = counters.attempted(),
                    "store failure budget exceeded, stopping early"
                );
                break (JobState::Failed, SyncStatus::Partial);
            }

            if cursor.is_none() {
                let status = if counters.failures == 0 {
                    SyncStatus::Success
                } else {
                    SyncStatus::Partial
                };
                break (JobState::Completed, status);
            }
        };

        self.transition(state);
        let finished_at = Utc::now();
        let ledger = match self.ledger.record_sync(resource, status, finished_at).await {
            Ok(_) => LedgerWrite::Recorded,
            Err(e) => {
                tracing::error!(%resource, %status, error = %e, "failed to record sync in ledger");
                LedgerWrite::Failed(e.to_string())
            }
        };

        tracing::info!(
            %resource,
            %state,
            %status,
            pages = counters.pages,
            records_seen = counters.records_seen,
            created = counters.created,
            skipped = counters.skipped,
            failures = counters.failures,
            "sync finished"
        );

        JobResult {
            resource,
            state,
            status,
            pages: counters.pages,
            records_seen: counters.records_seen,
            upserted: counters.upserted,
            created: counters.created,
            skipped: counters.skipped,
            failures: counters.failures,
            feed_error,
            ledger,
            started_at,
            finished_at,
        }
    }

    async fn process_page(
        &self,
        records: Vec<gridiron_core::ExternalRecord>,
        counters: &mut Counters,
    ) {
        for record in records {
            let entity = match normalize(record, self.resource) {
                Normalized::Entity(entity) => entity,
                Normalized::Skip(reason) => {
                    counters.skipped += 1;
                    tracing::warn!(resource = %self.resource, %reason, "skipping record");
                    continue;
                }
            };

            let external_id = entity.external_id;
            match self.store.upsert(entity).await {
                Ok(outcome) => {
                    counters.upserted += 1;
                    if outcome.created {
                        counters.created += 1;
                    }
                }
                Err(e) => {
                    counters.failures += 1;
                    tracing::warn!(
                        resource = %self.resource,
                        %external_id,
                        error = %e,
                        "upsert failed"
                    );
                }
            }
        }
    }
}
