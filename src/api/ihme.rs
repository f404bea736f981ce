//! Provides [`IhmeClient`] for the IHME health-indicator API: the location directory and
//! per-location indicator estimates.
//!
//! Unlike OpenAQ these endpoints are not paged; each call is a single request made under the
//! same [`RetryPolicy`] as the OpenAQ listings.

use crate::api::error::FetchError;
use crate::api::paginate::{get_json, RetryPolicy};
use crate::api::transport::{HttpTransport, Transport};
use crate::types::indicator::{
    Estimate, IhmeLocation, IhmeResponse, IndicatorQuery, IndicatorResult,
};
use log::{debug, info, warn};

const OUTPUT_DECIMALS: i32 = 3;

/// IHME client over an arbitrary [`Transport`].
#[derive(Debug, Clone)]
pub struct IhmeClient<T = HttpTransport> {
    transport: T,
    base_url: String,
    retry: RetryPolicy,
}

impl IhmeClient<HttpTransport> {
    /// Creates a client sending `api_key` in the `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidApiKey`] if the key can't be used as a header value.
    pub fn connect(base_url: &str, api_key: &str) -> Result<Self, FetchError> {
        Ok(Self::with_transport(
            HttpTransport::authorization(api_key)?,
            base_url,
        ))
    }
}

impl<T: Transport> IhmeClient<T> {
    pub fn with_transport(transport: T, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// Every location known to IHME.
    pub async fn locations(&self) -> Result<Vec<IhmeLocation>, FetchError> {
        let url = self.endpoint("GetLocation");
        let response: IhmeResponse<IhmeLocation> =
            get_json(&self.transport, &self.retry, &url, &[]).await?;
        info!("Fetched {} IHME locations", response.results.len());
        Ok(response.results)
    }

    /// Raw result rows for one location and indicator series.
    pub async fn results(
        &self,
        location_id: u64,
        query: &IndicatorQuery,
    ) -> Result<Vec<IndicatorResult>, FetchError> {
        let url = self.endpoint("GetResultsByLocation");
        let response: IhmeResponse<IndicatorResult> =
            get_json(&self.transport, &self.retry, &url, &query.params(location_id)).await?;
        Ok(response.results)
    }

    /// The mean estimate of the first result row, rounded to three decimals.
    ///
    /// # Returns
    ///
    /// `None` when upstream returned no rows or the first row carries no estimate. Additional
    /// rows are ignored with a warning.
    ///
    /// # Errors
    ///
    /// Besides the request errors of [`get_json`], returns [`FetchError::UnexpectedValue`] if the
    /// estimate is a string that isn't a number.
    pub async fn estimate(
        &self,
        location_id: u64,
        query: &IndicatorQuery,
    ) -> Result<Option<f64>, FetchError> {
        let results = self.results(location_id, query).await?;
        if results.len() > 1 {
            warn!(
                "Location {} returned {} results for indicator {}, using the first",
                location_id,
                results.len(),
                query.indicator_id
            );
        }

        let Some(estimate) = results.into_iter().next().and_then(|r| r.mean_estimate) else {
            warn!(
                "Location {} has no estimate for indicator {} in {}",
                location_id, query.indicator_id, query.year
            );
            return Ok(None);
        };
        let value = estimate
            .as_f64()
            .ok_or_else(|| FetchError::UnexpectedValue {
                url: self.endpoint("GetResultsByLocation"),
                field: "mean_estimate",
                value: match &estimate {
                    Estimate::Text(text) => text.clone(),
                    Estimate::Number(number) => number.to_string(),
                },
            })?;

        let factor = 10f64.powi(OUTPUT_DECIMALS);
        let rounded = (value * factor).round() / factor;
        debug!(
            "Location {} indicator {}: {}",
            location_id, query.indicator_id, rounded
        );
        Ok(Some(rounded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::scripted::ScriptedTransport;
    use serde_json::json;

    const BASE: &str = "https://ihme.test/api/";

    fn client(transport: ScriptedTransport) -> IhmeClient<ScriptedTransport> {
        IhmeClient::with_transport(transport, BASE)
    }

    #[tokio::test]
    async fn lists_locations() {
        let transport = ScriptedTransport::new();
        transport.push(
            "/GetLocation",
            200,
            json!({ "results": [
                { "location_id": 90, "location_name": "Norway", "parent_id": 73 },
                { "location_id": 67, "location_name": "Japan" }
            ]})
            .to_string(),
        );
        let client = client(transport);

        let locations = client.locations().await.unwrap();

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].location_id, 90);
        assert_eq!(locations[1].location_name, "Japan");
        let requests = client.transport().requests();
        assert_eq!(requests[0].url, "https://ihme.test/api/GetLocation");
        assert!(requests[0].query.is_empty());
    }

    #[tokio::test]
    async fn estimate_sends_the_series_and_rounds_the_first_row() {
        let transport = ScriptedTransport::new();
        transport.push(
            "/GetResultsByLocation",
            200,
            json!({ "results": [
                { "mean_estimate": 12.34567 },
                { "mean_estimate": 99.0 }
            ]})
            .to_string(),
        );
        let client = client(transport);
        let query = IndicatorQuery::builder().indicator_id(7).year(2021).build();

        let value = client.estimate(90, &query).await.unwrap();

        assert_eq!(value, Some(12.346));
        let request = &client.transport().requests()[0];
        assert_eq!(request.url, "https://ihme.test/api/GetResultsByLocation");
        assert_eq!(request.param("location_id"), Some("90"));
        assert_eq!(request.param("indicator_id"), Some("7"));
        assert_eq!(request.param("year"), Some("2021"));
        assert_eq!(request.param("sex_id"), Some("3"));
        assert_eq!(request.param("age_group_id"), Some("22"));
        assert_eq!(request.param("scenario"), Some("0"));
    }

    #[tokio::test]
    async fn empty_results_are_absent() {
        let transport = ScriptedTransport::new();
        transport.push("/GetResultsByLocation", 200, r#"{ "results": [] }"#);

        let value = client(transport)
            .estimate(90, &IndicatorQuery::default())
            .await
            .unwrap();

        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn non_numeric_estimate_is_an_error() {
        let transport = ScriptedTransport::new();
        transport.push(
            "/GetResultsByLocation",
            200,
            r#"{ "results": [{ "mean_estimate": "unknown" }] }"#,
        );

        let err = client(transport)
            .estimate(90, &IndicatorQuery::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::UnexpectedValue {
                field: "mean_estimate",
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_lookup_is_retried() {
        let transport = ScriptedTransport::new();
        transport
            .push("/GetLocation", 429, "")
            .push("/GetLocation", 200, r#"{ "results": [] }"#);
        let client = client(transport);

        assert!(client.locations().await.unwrap().is_empty());
        assert_eq!(client.transport().requests().len(), 2);
    }
}
