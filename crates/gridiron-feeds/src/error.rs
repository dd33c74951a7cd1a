use gridiron_core::{PageCursor, ResourceType};

/// Errors surfaced by a [`FeedClient`](crate::FeedClient).
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Transient failures persisted through every retry.
    #[error(
        "feed unavailable for {resource} after {attempts} attempt(s){}: {message}",
        .last_status.map(|s| format!(" (last status {s})")).unwrap_or_default()
    )]
    Unavailable {
        resource: ResourceType,
        cursor: Option<PageCursor>,
        attempts: u32,
        last_status: Option<u16>,
        message: String,
    },

    /// The provider answered with a non-retryable status (4xx other than 429).
    #[error("provider rejected {resource} request with HTTP {status}: {message}")]
    Rejected {
        resource: ResourceType,
        cursor: Option<PageCursor>,
        status: u16,
        message: String,
    },

    /// A successful response whose body is not a page envelope.
    #[error("could not decode {resource} page: {message}")]
    Decode {
        resource: ResourceType,
        cursor: Option<PageCursor>,
        message: String,
    },

    #[error("feed client configuration error: {0}")]
    Config(String),
}

impl FeedError {
    /// Cursor of the page that failed, so callers can resume or abort there.
    pub fn cursor(&self) -> Option<&PageCursor> {
        match self {
            FeedError::Unavailable { cursor, .. }
            | FeedError::Rejected { cursor, .. }
            | FeedError::Decode { cursor, .. } => cursor.as_ref(),
            FeedError::Config(_) => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FeedError::Unavailable { .. })
    }
}
