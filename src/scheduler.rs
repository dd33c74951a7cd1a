//! SyncScheduler — the boundary that starts [`ResourceSyncJob`]s.
//!
//! Jobs for different resource types run as independent tokio tasks; a
//! resource type already being synced is refused rather than run twice.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gridiron_core::config::Config;
use gridiron_core::store::FileStore;
use gridiron_core::{ResourceType, SyncLedger, UpsertStore};
use gridiron_feeds::{FeedClient, HttpFeedClient};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::job::{FailureBudget, JobConfig, JobResult, ResourceSyncJob};

/// Shortest period [`SyncScheduler::run_every`] will tick at.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("a sync for {0} is already running")]
    AlreadyRunning(ResourceType),

    #[error("sync task for {resource} failed: {message}")]
    Task {
        resource: ResourceType,
        message: String,
    },
}

/// Starts sync jobs against shared feed, store and ledger instances.
/// Clones share everything, including the set of running resources.
#[derive(Clone)]
pub struct SyncScheduler {
    feed: Arc<dyn FeedClient>,
    store: Arc<dyn UpsertStore>,
    ledger: Arc<SyncLedger>,
    config: JobConfig,
    running: Arc<Mutex<HashSet<ResourceType>>>,
    shutdown: CancellationToken,
}

/// Removes a resource from the running set when its job ends, however it ends.
struct RunningGuard {
    resource: ResourceType,
    running: Arc<Mutex<HashSet<ResourceType>>>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.running.lock() {
            set.remove(&self.resource);
        }
    }
}

impl SyncScheduler {
    pub fn new(
        feed: Arc<dyn FeedClient>,
        store: Arc<dyn UpsertStore>,
        ledger: Arc<SyncLedger>,
        config: JobConfig,
    ) -> Self {
        Self {
            feed,
            store,
            ledger,
            config,
            running: Arc::new(Mutex::new(HashSet::new())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Wire the HTTP feed, file store and file ledger described by `cfg`.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let feed = HttpFeedClient::new(&cfg.provider, &cfg.retry)?;
        let store = FileStore::open(cfg.storage.entities_dir());
        let ledger = SyncLedger::open(cfg.storage.ledger_path());
        let job = JobConfig {
            page_size: Some(cfg.provider.default_page_size),
            failure_budget: FailureBudget::from(&cfg.sync),
        };
        Ok(Self::new(Arc::new(feed), Arc::new(store), Arc::new(ledger), job))
    }

    pub fn ledger(&self) -> &Arc<SyncLedger> {
        &self.ledger
    }

    /// Firing this token stops every running job after its current page and
    /// ends [`run_every`](Self::run_every).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn claim(&self, resource: ResourceType) -> Result<RunningGuard, SchedulerError> {
        let mut set = self
            .running
            .lock()
            .map_err(|_| SchedulerError::Task {
                resource,
                message: "running-set lock poisoned".into(),
            })?;
        if !set.insert(resource) {
            return Err(SchedulerError::AlreadyRunning(resource));
        }
        Ok(RunningGuard {
            resource,
            running: Arc::clone(&self.running),
        })
    }

    /// Run one sync for `resource` and wait for it.
    pub async fn run_sync(&self, resource: ResourceType) -> Result<JobResult, SchedulerError> {
        let _guard = self.claim(resource)?;
        let job = ResourceSyncJob::new(
            resource,
            Arc::clone(&self.feed),
            Arc::clone(&self.store),
            Arc::clone(&self.ledger),
            self.config.clone(),
        )
        .with_cancellation(self.shutdown.child_token());

        let result = job.run().await;
        if result.ledger_failed() {
            tracing::error!(
                %resource,
                status = %result.status,
                "ledger not updated; next run will see stale sync status"
            );
        }
        Ok(result)
    }

    /// Run one job per resource concurrently. Results come back in the order
    /// of `resources`.
    pub async fn run_all(
        &self,
        resources: &[ResourceType],
    ) -> Vec<(ResourceType, Result<JobResult, SchedulerError>)> {
        let mut tasks = JoinSet::new();
        for (idx, &resource) in resources.iter().enumerate() {
            let this = self.clone();
            tasks.spawn(async move { (idx, resource, this.run_sync(resource).await) });
        }

        let mut out: Vec<Option<(ResourceType, Result<JobResult, SchedulerError>)>> =
            (0..resources.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, resource, result)) => out[idx] = Some((resource, result)),
                Err(e) => tracing::error!(error = %e, "sync task panicked or was aborted"),
            }
        }

        out.into_iter()
            .zip(resources)
            .map(|(slot, &resource)| {
                slot.unwrap_or_else(|| {
                    (
                        resource,
                        Err(SchedulerError::Task {
                            resource,
                            message: "task did not complete".into(),
                        }),
                    )
                })
            })
            .collect()
    }

    /// Run [`run_all`](Self::run_all) every `interval` until the shutdown
    /// token fires. Returns the number of rounds started.
    ///
    /// Intervals shorter than [`MIN_INTERVAL`] (including zero) are raised to it.
    pub async fn run_every(&self, resources: &[ResourceType], interval: Duration) -> usize {
        let interval = if interval < MIN_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                using_ms = MIN_INTERVAL.as_millis() as u64,
                "sync interval too short, clamping"
            );
            MIN_INTERVAL
        } else {
            interval
        };
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut rounds = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            rounds += 1;
            let results = self.run_all(resources).await;
            for (resource, result) in &results {
                match result {
                    Ok(r) => tracing::info!(
                        round = rounds,
                        %resource,
                        status = %r.status,
                        records = r.records_seen,
                        failures = r.failures,
                        "scheduled sync done"
                    ),
                    Err(e) => tracing::warn!(round = rounds, %resource, error = %e, "scheduled sync not run"),
                }
            }
        }

        tracing::info!(rounds, "scheduler stopped");
        rounds
    }
}
