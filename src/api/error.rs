use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    UpstreamStatus {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("Still rate limited after {attempts} attempts for {url}")]
    RateLimitExhausted { url: String, attempts: u32 },

    #[error("Pagination for {url} did not terminate within {pages} pages")]
    PageLimitExceeded { url: String, pages: u32 },

    #[error("Failed to parse JSON response from {url}")]
    JsonParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected {field} value '{value}' from {url}")]
    UnexpectedValue {
        url: String,
        field: &'static str,
        value: String,
    },

    #[error("API key is not a valid header value")]
    InvalidApiKey(#[source] reqwest::header::InvalidHeaderValue),

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}
