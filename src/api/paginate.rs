//! Draining of OpenAQ's paged listing endpoints.
//!
//! Every listing response carries a `meta.found` field. While more records exist than a single
//! page can hold, upstream reports it as the string `">{limit}"` instead of a count; any other
//! value means the current page is the last one. Paging therefore continues exactly as long as
//! `meta.found` equals that sentinel.
//!
//! HTTP 429 responses are retried for the same page after a fixed cooldown. Other failures are
//! retried a bounded number of times and then surfaced.

use crate::api::error::FetchError;
use crate::api::transport::Transport;
use bon::Builder;
use log::{debug, error, warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);
pub const DEFAULT_ERROR_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ERROR_RETRIES: u32 = 2;

/// How the paginator reacts to rate limiting, upstream failures and runaway pagination.
///
/// The default retries rate-limited requests forever, matching how upstream expects batch
/// clients to behave. Set `max_rate_limit_retries` and `max_pages` to bound a run.
///
/// # Examples
///
/// ```
/// use openaq_collect::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .cooldown(Duration::from_secs(30))
///     .max_rate_limit_retries(10)
///     .build();
/// assert_eq!(policy.max_pages, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct RetryPolicy {
    /// Fixed wait after a 429 response before the same page is requested again.
    #[builder(default = DEFAULT_COOLDOWN)]
    pub cooldown: Duration,
    /// Consecutive 429 responses tolerated for one request. Any other failure resets the count.
    /// `None` retries indefinitely.
    pub max_rate_limit_retries: Option<u32>,
    /// Retries for any other non-200 status before the page fails.
    #[builder(default = DEFAULT_MAX_ERROR_RETRIES)]
    pub max_error_retries: u32,
    /// Wait between retries of a failed (non-429) request.
    #[builder(default = DEFAULT_ERROR_DELAY)]
    pub error_delay: Duration,
    /// Upper bound on pages drained from one endpoint. `None` follows the sentinel forever.
    pub max_pages: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::builder().build()
    }
}

/// The `meta.found` value of a listing response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Found {
    Count(u64),
    Text(String),
}

impl Found {
    /// True only for the literal `">{page_size}"` sentinel.
    pub fn signals_more(&self, page_size: u32) -> bool {
        match self {
            Found::Text(text) => *text == format!(">{page_size}"),
            Found::Count(_) => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub found: Option<Found>,
}

/// Envelope shared by all listing endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound = "R: DeserializeOwned")]
pub struct Page<R> {
    pub meta: Meta,
    #[serde(default = "Vec::new")]
    pub results: Vec<R>,
}

impl<R> Page<R> {
    pub fn has_more(&self, page_size: u32) -> bool {
        self.meta
            .found
            .as_ref()
            .is_some_and(|found| found.signals_more(page_size))
    }
}

/// Lazily walks the pages of one listing endpoint.
pub struct PageCursor<'a, T, R> {
    transport: &'a T,
    policy: &'a RetryPolicy,
    url: String,
    params: Vec<(String, String)>,
    page_size: u32,
    page: u32,
    finished: bool,
    _record: PhantomData<fn() -> R>,
}

impl<'a, T, R> PageCursor<'a, T, R>
where
    T: Transport,
    R: DeserializeOwned,
{
    pub fn new(
        transport: &'a T,
        policy: &'a RetryPolicy,
        url: impl Into<String>,
        params: Vec<(String, String)>,
        page_size: u32,
    ) -> Self {
        Self {
            transport,
            policy,
            url: url.into(),
            params,
            page_size,
            page: 1,
            finished: false,
            _record: PhantomData,
        }
    }

    /// Number of pages successfully fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.page - 1
    }

    /// Fetches the next page, or `None` once upstream reported a terminal count.
    ///
    /// # Errors
    ///
    /// * [`FetchError::PageLimitExceeded`] if the policy's page guard is hit.
    /// * [`FetchError::RateLimitExhausted`] / [`FetchError::UpstreamStatus`] once retries run out.
    /// * [`FetchError::JsonParse`] if a 200 response is not a listing envelope.
    pub async fn next_page(&mut self) -> Result<Option<Vec<R>>, FetchError> {
        if self.finished {
            return Ok(None);
        }
        if let Some(max_pages) = self.policy.max_pages {
            if self.page > max_pages {
                return Err(FetchError::PageLimitExceeded {
                    url: self.url.clone(),
                    pages: max_pages,
                });
            }
        }

        let page = self.fetch_page().await?;
        if !page.has_more(self.page_size) {
            self.finished = true;
        }
        debug!(
            "Fetched page {} of {} with {} results (found: {:?})",
            self.page,
            self.url,
            page.results.len(),
            page.meta.found
        );
        self.page += 1;
        Ok(Some(page.results))
    }

    /// Collects the results of all remaining pages.
    pub async fn drain(mut self) -> Result<Vec<R>, FetchError> {
        let mut records = Vec::new();
        while let Some(mut batch) = self.next_page().await? {
            records.append(&mut batch);
        }
        Ok(records)
    }

    fn query(&self) -> Vec<(String, String)> {
        let mut query = self.params.clone();
        query.push(("limit".to_string(), self.page_size.to_string()));
        query.push(("page".to_string(), self.page.to_string()));
        query
    }

    async fn fetch_page(&self) -> Result<Page<R>, FetchError> {
        get_json(self.transport, self.policy, &self.url, &self.query()).await
    }
}

/// Issues one GET and decodes a 200 body as `R`, applying `policy` to 429 and other failures.
///
/// # Errors
///
/// * [`FetchError::RateLimitExhausted`] once more consecutive 429s arrive than the policy allows.
/// * [`FetchError::UpstreamStatus`] once other failures exceed `max_error_retries`.
/// * [`FetchError::JsonParse`] if the 200 body doesn't decode as `R`.
pub async fn get_json<T, R>(
    transport: &T,
    policy: &RetryPolicy,
    url: &str,
    query: &[(String, String)],
) -> Result<R, FetchError>
where
    T: Transport,
    R: DeserializeOwned,
{
    let mut rate_limited = 0u32;
    let mut failures = 0u32;

    loop {
        let response = transport.get(url, query).await?;
        match response.status {
            StatusCode::OK => {
                return serde_json::from_str(&response.body).map_err(|source| {
                    FetchError::JsonParse {
                        url: url.to_string(),
                        source,
                    }
                });
            }
            StatusCode::TOO_MANY_REQUESTS => {
                rate_limited += 1;
                if policy
                    .max_rate_limit_retries
                    .is_some_and(|max| rate_limited > max)
                {
                    return Err(FetchError::RateLimitExhausted {
                        url: url.to_string(),
                        attempts: rate_limited,
                    });
                }
                warn!(
                    "Rate limited on {} {:?}, retrying in {:?}",
                    url, query, policy.cooldown
                );
                sleep(policy.cooldown).await;
            }
            status => {
                rate_limited = 0;
                failures += 1;
                error!(
                    "Request to {} {:?} failed with status {}: {}",
                    url, query, status, response.body
                );
                if failures > policy.max_error_retries {
                    return Err(FetchError::UpstreamStatus {
                        url: url.to_string(),
                        status,
                        body: response.body,
                    });
                }
                sleep(policy.error_delay).await;
            }
        }
    }
}

/// Drains every page of `url`, appending each page's `results` in order.
pub async fn drain<T, R>(
    transport: &T,
    policy: &RetryPolicy,
    url: &str,
    params: Vec<(String, String)>,
    page_size: u32,
) -> Result<Vec<R>, FetchError>
where
    T: Transport,
    R: DeserializeOwned,
{
    PageCursor::new(transport, policy, url, params, page_size)
        .drain()
        .await
}
