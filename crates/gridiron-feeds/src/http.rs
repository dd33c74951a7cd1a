//! HTTP feed client for the provider's cursor-paginated REST API.
//!
//! `GET {base_url}/{path}?per_page=N[&cursor=C]` with the API key in the
//! `Authorization` header. Timeouts, connection errors, 5xx and 429 are
//! retried per [`RetryPolicy`]; other 4xx and undecodable bodies fail at once.

use std::collections::HashMap;
use std::time::Duration;

use gridiron_core::config::{ProviderConfig, RetryConfig};
use gridiron_core::{PageCursor, ResourceType};
use reqwest::StatusCode;

use crate::error::FeedError;
use crate::retry::RetryPolicy;
use crate::wire::decode_page;
use crate::{FeedClient, Page};

const USER_AGENT: &str = concat!("gridiron/", env!("CARGO_PKG_VERSION"));

/// Provider client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    paths: HashMap<ResourceType, String>,
    default_page_size: u32,
    max_page_size: u32,
    retry: RetryPolicy,
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(Page),
    Transient {
        status: Option<u16>,
        message: String,
        retry_after: Option<Duration>,
    },
    Fatal(FeedError),
}

impl HttpFeedClient {
    pub fn new(provider: &ProviderConfig, retry: &RetryConfig) -> Result<Self, FeedError> {
        Self::with_policy(provider, RetryPolicy::from_config(retry))
    }

    pub fn with_policy(provider: &ProviderConfig, retry: RetryPolicy) -> Result<Self, FeedError> {
        let base_url = provider.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(FeedError::Config(format!(
                "base_url must be an http(s) URL, got {base_url:?}"
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(provider.request_timeout())
            .build()
            .map_err(|e| FeedError::Config(format!("failed to build HTTP client: {e}")))?;

        let paths = ResourceType::ALL
            .into_iter()
            .map(|r| (r, provider.path_for(r).trim_matches('/').to_string()))
            .collect();

        let max_page_size = provider.max_page_size.max(1);
        Ok(Self {
            client,
            base_url,
            api_key: provider.resolved_api_key(),
            paths,
            default_page_size: provider.default_page_size.clamp(1, max_page_size),
            max_page_size,
            retry,
        })
    }

    /// Effective `per_page` for a request: default when unset, clamped to
    /// `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }

    pub fn url_for(&self, resource: ResourceType) -> String {
        let path = self
            .paths
            .get(&resource)
            .map(String::as_str)
            .unwrap_or_else(|| resource.default_path());
        format!("{}/{}", self.base_url, path)
    }

    async fn attempt(
        &self,
        resource: ResourceType,
        url: &str,
        cursor: Option<&PageCursor>,
        per_page: u32,
    ) -> Attempt {
        let mut request = self.client.get(url).query(&[("per_page", per_page.to_string())]);
        if let Some(c) = cursor {
            request = request.query(&[("cursor", c.as_str())]);
        }
        if let Some(key) = &self.api_key {
            request = request.header(reqwest::header::AUTHORIZATION, key.as_str());
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_builder() => {
                return Attempt::Fatal(FeedError::Config(format!("invalid request: {e}")))
            }
            Err(e) => {
                return Attempt::Transient {
                    status: None,
                    message: e.to_string(),
                    retry_after: None,
                }
            }
        };

        let status = response.status();
        let retry_after = retry_after(&response);

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Attempt::Transient {
                status: Some(status.as_u16()),
                message: summarize(status, &body),
                retry_after,
            };
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Attempt::Fatal(FeedError::Rejected {
                resource,
                cursor: cursor.cloned(),
                status: status.as_u16(),
                message: summarize(status, &body),
            });
        }

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return Attempt::Transient {
                    status: Some(status.as_u16()),
                    message: format!("failed reading body: {e}"),
                    retry_after: None,
                }
            }
        };

        match decode_page(&body) {
            Ok(page) => Attempt::Done(page),
            Err(e) => Attempt::Fatal(FeedError::Decode {
                resource,
                cursor: cursor.cloned(),
                message: e.to_string(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch_page(
        &self,
        resource: ResourceType,
        cursor: Option<&PageCursor>,
        page_size: Option<u32>,
    ) -> Result<Page, FeedError> {
        let url = self.url_for(resource);
        let per_page = self.page_size(page_size);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let (status, message, retry_after) =
                match self.attempt(resource, &url, cursor, per_page).await {
                    Attempt::Done(page) => {
                        tracing::debug!(
                            %resource,
                            cursor = ?cursor.map(PageCursor::as_str),
                            records = page.records.len(),
                            next = ?page.next_cursor.as_ref().map(PageCursor::as_str),
                            "fetched page"
                        );
                        return Ok(page);
                    }
                    Attempt::Fatal(e) => return Err(e),
                    Attempt::Transient {
                        status,
                        message,
                        retry_after,
                    } => (status, message, retry_after),
                };

            if attempts >= self.retry.max_attempts {
                tracing::error!(
                    %resource,
                    cursor = ?cursor.map(PageCursor::as_str),
                    attempts,
                    status = ?status,
                    error = %message,
                    "feed retries exhausted"
                );
                return Err(FeedError::Unavailable {
                    resource,
                    cursor: cursor.cloned(),
                    attempts,
                    last_status: status,
                    message,
                });
            }

            let delay = self.retry.delay(attempts, retry_after);
            tracing::warn!(
                %resource,
                cursor = ?cursor.map(PageCursor::as_str),
                attempt = attempts,
                status = ?status,
                delay_ms = delay.as_millis() as u64,
                error = %message,
                "transient feed error, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn summarize(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status.to_string();
    }
    let snippet: String = body.chars().take(200).collect();
    format!("{status}: {snippet}")
}
