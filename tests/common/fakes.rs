//! In-process fakes for the three seams a sync job talks to.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gridiron_core::ledger::{LedgerError, LedgerStorage};
use gridiron_core::store::MemoryStore;
use gridiron_core::{
    CanonicalEntity, EntityKind, EntityQuery, EntityReader, ExternalId, ExternalRecord,
    PageCursor, ResourceType, StoreError, StoredEntity, UpsertOutcome, UpsertStore,
};
use gridiron_feeds::{FeedClient, FeedError, Page};
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;

type Key = (ResourceType, Option<String>);

// ---------------------------------------------------------------------------
// ScriptedFeed
// ---------------------------------------------------------------------------

/// Blocks every fetch until [`Gate::open`] is called.
pub struct Gate {
    entered: Notify,
    release: Semaphore,
}

impl Gate {
    fn new() -> Self {
        Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }

    /// Resolves once a fetch is waiting at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.release.add_permits(1);
    }
}

/// Feed that serves pages from a script keyed by `(resource, cursor)`.
///
/// Scripted failures for a key are returned (once each) before its page.
/// Unscripted keys return a `Rejected` 404 so a wrong cursor fails loudly.
#[derive(Default)]
pub struct ScriptedFeed {
    pages: Mutex<HashMap<Key, Page>>,
    failures: Mutex<HashMap<Key, VecDeque<FeedError>>>,
    calls: Mutex<Vec<Key>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
    gate: Mutex<Option<Arc<Gate>>>,
    fetches: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` for `resource` at `cursor` (`None` = first page).
    pub fn page(self, resource: ResourceType, cursor: Option<&str>, page: Page) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert((resource, cursor.map(str::to_string)), page);
        self
    }

    /// Serve `pages` in order for `resource`, chaining cursors `c1`, `c2`, …
    pub fn pages(mut self, resource: ResourceType, pages: Vec<Vec<ExternalRecord>>) -> Self {
        let n = pages.len();
        for (i, records) in pages.into_iter().enumerate() {
            let cursor = (i > 0).then(|| format!("c{i}"));
            let next = (i + 1 < n).then(|| PageCursor::new(format!("c{}", i + 1)));
            self = self.page(
                resource,
                cursor.as_deref(),
                Page {
                    records,
                    next_cursor: next,
                },
            );
        }
        self
    }

    /// Fail the next fetch of `(resource, cursor)` with `error`.
    pub fn fail(self, resource: ResourceType, cursor: Option<&str>, error: FeedError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .entry((resource, cursor.map(str::to_string)))
            .or_default()
            .push_back(error);
        self
    }

    /// Cancel `token` right after the `n`-th fetch returns.
    pub fn cancel_after(self, n: usize, token: CancellationToken) -> Self {
        *self.cancel_after.lock().unwrap() = Some((n, token));
        self
    }

    /// Hold fetches at a gate the test controls.
    pub fn gated(self) -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Every `(resource, cursor)` fetched so far, in order.
    pub fn calls(&self) -> Vec<Key> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FeedClient for ScriptedFeed {
    async fn fetch_page(
        &self,
        resource: ResourceType,
        cursor: Option<&PageCursor>,
        _page_size: Option<u32>,
    ) -> Result<Page, FeedError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            drop(gate.release.acquire().await);
        }

        let key = (resource, cursor.map(|c| c.as_str().to_string()));
        self.calls.lock().unwrap().push(key.clone());
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;

        let result = {
            let injected = self
                .failures
                .lock()
                .unwrap()
                .get_mut(&key)
                .and_then(VecDeque::pop_front);
            match injected {
                Some(err) => Err(err),
                None => self.pages.lock().unwrap().get(&key).cloned().ok_or_else(|| {
                    FeedError::Rejected {
                        resource,
                        cursor: cursor.cloned(),
                        status: 404,
                        message: "unscripted page".into(),
                    }
                }),
            }
        };

        if let Some((after, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if n >= *after {
                token.cancel();
            }
        }
        result
    }
}

/// Retries-exhausted error, as the HTTP client reports it.
pub fn unavailable(resource: ResourceType, cursor: Option<&str>) -> FeedError {
    FeedError::Unavailable {
        resource,
        cursor: cursor.map(PageCursor::new),
        attempts: 4,
        last_status: Some(503),
        message: "503 Service Unavailable".into(),
    }
}

// ---------------------------------------------------------------------------
// FlakyStore
// ---------------------------------------------------------------------------

/// [`MemoryStore`] that refuses writes for chosen external ids.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<i64>>,
    fail_all: AtomicBool,
}

impl FlakyStore {
    pub fn failing_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        let store = Self::default();
        store.failing.lock().unwrap().extend(ids);
        store
    }

    pub fn failing_everything() -> Self {
        let store = Self::default();
        store.fail_all.store(true, Ordering::SeqCst);
        store
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait::async_trait]
impl UpsertStore for FlakyStore {
    async fn upsert(&self, entity: CanonicalEntity) -> Result<UpsertOutcome, StoreError> {
        let refuse = self.fail_all.load(Ordering::SeqCst)
            || self.failing.lock().unwrap().contains(&entity.external_id.0);
        if refuse {
            return Err(StoreError::Unavailable(std::io::Error::other(format!(
                "injected failure for {}",
                entity.external_id
            ))));
        }
        self.inner.upsert(entity).await
    }
}

#[async_trait::async_trait]
impl EntityReader for FlakyStore {
    async fn get(
        &self,
        kind: EntityKind,
        external_id: ExternalId,
    ) -> Result<Option<StoredEntity>, StoreError> {
        self.inner.get(kind, external_id).await
    }

    async fn query(
        &self,
        kind: EntityKind,
        query: &EntityQuery,
    ) -> Result<Vec<StoredEntity>, StoreError> {
        self.inner.query(kind, query).await
    }
}

// ---------------------------------------------------------------------------
// FailingLedgerStorage
// ---------------------------------------------------------------------------

/// Ledger storage whose writes always fail. Reads see an empty ledger.
#[derive(Clone, Default)]
pub struct FailingLedgerStorage {
    pub saves: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl LedgerStorage for FailingLedgerStorage {
    async fn load(&self) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(None)
    }

    async fn save(&self, _bytes: Vec<u8>) -> Result<(), LedgerError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(LedgerError::Io(std::io::Error::other("disk full")))
    }
}
