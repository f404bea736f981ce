//! Provides [`OpenAqClient`], the typed entry point to the two OpenAQ v3 endpoints the
//! collector needs: location listings by country and yearly summaries by sensor.

use crate::api::error::FetchError;
use crate::api::paginate::{drain, RetryPolicy};
use crate::api::transport::{HttpTransport, Transport};
use crate::types::location::Location;
use crate::types::summary::YearlySummary;
use log::info;

pub const DEFAULT_BASE_URL: &str = "https://api.openaq.org/v3";
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// OpenAQ v3 client over an arbitrary [`Transport`].
#[derive(Debug, Clone)]
pub struct OpenAqClient<T = HttpTransport> {
    transport: T,
    base_url: String,
    page_size: u32,
    retry: RetryPolicy,
}

impl OpenAqClient<HttpTransport> {
    /// Creates a client authenticating with `api_key` against `base_url`.
    pub fn connect(base_url: &str, api_key: &str) -> Result<Self, FetchError> {
        Ok(Self::with_transport(HttpTransport::new(api_key)?, base_url))
    }
}

impl<T: Transport> OpenAqClient<T> {
    /// Creates a client issuing its requests through `transport`.
    ///
    /// # Arguments
    ///
    /// * `transport` - Performs the GET requests. Authentication is the transport's concern.
    /// * `base_url` - The v3 API root, e.g. `https://api.openaq.org/v3`. A trailing `/` is ignored.
    ///
    /// # Returns
    ///
    /// A client using [`DEFAULT_PAGE_SIZE`] and the default [`RetryPolicy`].
    pub fn with_transport(transport: T, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the `limit` sent with every listing request.
    ///
    /// Also determines the `">{limit}"` sentinel that keeps pagination going.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Replaces the policy applied to rate limiting, upstream failures and page counts.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The transport requests go through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The API root without a trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// All locations registered for an ISO alpha-2 country code.
    pub async fn locations(&self, iso: &str) -> Result<Vec<Location>, FetchError> {
        let url = format!("{}/locations", self.base_url);
        let locations: Vec<Location> = drain(
            &self.transport,
            &self.retry,
            &url,
            vec![("iso".to_string(), iso.to_string())],
            self.page_size,
        )
        .await?;
        info!("Fetched {} locations for {}", locations.len(), iso);
        Ok(locations)
    }

    /// Every yearly summary published for a sensor.
    pub async fn sensor_years(&self, sensor_id: u64) -> Result<Vec<YearlySummary>, FetchError> {
        let url = format!("{}/sensors/{}/years", self.base_url, sensor_id);
        drain(&self.transport, &self.retry, &url, Vec::new(), self.page_size).await
    }
}
