//! gridiron-feeds — provider feed adapters for gridiron.
//!
//! A [`FeedClient`] fetches one page of one resource at a time. Pagination is
//! driven by the caller: pass `None` for the first page, then whatever
//! [`Page::next_cursor`] came back, until it is `None`.

pub mod error;
pub mod http;
pub mod retry;
mod wire;

pub use error::FeedError;
pub use http::HttpFeedClient;
pub use retry::RetryPolicy;

use gridiron_core::{ExternalRecord, PageCursor, ResourceType};

/// One page of provider records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub records: Vec<ExternalRecord>,
    /// `None` is the only end-of-feed signal. An empty `records` list with a
    /// cursor means "keep going".
    pub next_cursor: Option<PageCursor>,
}

/// Cursor-paginated access to a provider collection.
#[async_trait::async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch the page at `cursor` (`None` = first page). Transient failures
    /// are retried internally with the same cursor; the error returned after
    /// the last attempt carries that cursor back to the caller.
    async fn fetch_page(
        &self,
        resource: ResourceType,
        cursor: Option<&PageCursor>,
        page_size: Option<u32>,
    ) -> Result<Page, FeedError>;
}
