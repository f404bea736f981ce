//! The HTTP seam between the OpenAQ client and the network.
//!
//! [`Transport`] issues a single authenticated GET and hands back the raw status and body,
//! leaving status interpretation (rate limits, upstream failures) to the paginator.
//! [`HttpTransport`] is the `reqwest` implementation used in production, attaching the API key
//! under whichever header the upstream expects.

use crate::api::error::FetchError;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::future::Future;

const API_KEY_HEADER: &str = "X-API-Key";
const AUTHORIZATION_HEADER: &str = "Authorization";

/// Status and body of one upstream response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Issues GET requests against the upstream API.
pub trait Transport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> impl Future<Output = Result<RawResponse, FetchError>> + Send;
}

/// `reqwest`-backed transport that attaches the API key header to every request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Transport for OpenAQ, which expects the key in `X-API-Key`.
    pub fn new(api_key: &str) -> Result<Self, FetchError> {
        Self::with_key_header(API_KEY_HEADER, api_key)
    }

    /// Transport for IHME, which expects the raw key in `Authorization`.
    pub fn authorization(api_key: &str) -> Result<Self, FetchError> {
        Self::with_key_header(AUTHORIZATION_HEADER, api_key)
    }

    /// Sends `api_key` as the sensitive header `header` on every request.
    fn with_key_header(header: &'static str, api_key: &str) -> Result<Self, FetchError> {
        let mut key = HeaderValue::from_str(api_key).map_err(FetchError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header, key);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<RawResponse, FetchError> {
        debug!("GET {} {:?}", url, query);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    //! In-memory transport that replays canned responses and records every request.

    use super::{RawResponse, Transport};
    use crate::api::error::FetchError;
    use reqwest::StatusCode;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedRequest {
        pub url: String,
        pub query: Vec<(String, String)>,
    }

    impl RecordedRequest {
        pub fn param(&self, key: &str) -> Option<&str> {
            self.query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Responses are queued per URL path suffix (e.g. `/locations`) and consumed in order.
    /// Once a queue holds a single entry that entry is repeated forever.
    #[derive(Default)]
    pub struct ScriptedTransport {
        routes: Mutex<HashMap<String, VecDeque<RawResponse>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, path: &str, status: u16, body: impl Into<String>) -> &Self {
            let status = StatusCode::from_u16(status).unwrap();
            self.routes
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_default()
                .push_back(RawResponse {
                    status,
                    body: body.into(),
                });
            self
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
            self.requests()
                .into_iter()
                .filter(|r| r.url.ends_with(path))
                .collect()
        }
    }

    impl Transport for ScriptedTransport {
        async fn get(
            &self,
            url: &str,
            query: &[(String, String)],
        ) -> Result<RawResponse, FetchError> {
            self.requests.lock().unwrap().push(RecordedRequest {
                url: url.to_string(),
                query: query.to_vec(),
            });

            let mut routes = self.routes.lock().unwrap();
            let queue = routes
                .iter_mut()
                .find(|(path, _)| url.ends_with(path.as_str()))
                .map(|(_, queue)| queue);

            let response = match queue {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };
            Ok(response.unwrap_or(RawResponse {
                status: StatusCode::NOT_FOUND,
                body: String::new(),
            }))
        }
    }
}
