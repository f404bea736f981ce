//! Collects one IHME health-indicator estimate per country.
//!
//! Countries are matched to IHME locations by name: every `location_name` in the IHME
//! directory that resolves to one of the requested alpha-2 codes maps that code to its
//! `location_id`. The first matching location wins.

use crate::api::ihme::IhmeClient;
use crate::api::transport::{HttpTransport, Transport};
use crate::config::Config;
use crate::countries::{alpha2_for, resolve_countries};
use crate::error::CollectorError;
use crate::types::indicator::{IhmeLocation, IndicatorQuery};
use crate::types::results::{ParameterAverage, ResultTable};
use bon::bon;
use indexmap::IndexMap;
use log::{debug, info, warn};

/// Column holding the estimate in the indicator table.
pub const INDICATOR_COLUMN: &str = "value";

/// Fetches IHME indicator estimates for a list of countries.
pub struct IndicatorCollector<T = HttpTransport> {
    client: IhmeClient<T>,
}

impl IndicatorCollector<HttpTransport> {
    /// Builds a collector from `ihme_api_url`, `ihme_api_key` and the `retry` section of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Config`] if the IHME URL or key is missing.
    pub fn from_config(config: &Config) -> Result<Self, CollectorError> {
        config.validate_ihme()?;
        let client = IhmeClient::connect(&config.ihme_api_url, &config.ihme_api_key)?
            .retry_policy(config.retry.to_policy());
        Ok(Self::new(client))
    }
}

#[bon]
impl<T: Transport> IndicatorCollector<T> {
    pub fn new(client: IhmeClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &IhmeClient<T> {
        &self.client
    }

    /// Collects one estimate per country into a table with a single [`INDICATOR_COLUMN`].
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.countries(&[String])`: **Required.** Country names or alpha-2 codes, in output order.
    /// * `.query(IndicatorQuery)`: Optional. The indicator series. Defaults to [`IndicatorQuery::default`].
    ///
    /// # Returns
    ///
    /// A [`ResultTable`] with a record for every country. Countries IHME doesn't list, or lists
    /// without an estimate, are [`ParameterAverage::Absent`].
    ///
    /// # Errors
    ///
    /// * [`CollectorError::UnknownCountry`] before any request, if a country can't be resolved.
    /// * [`CollectorError::Fetch`] if the directory or an estimate can't be retrieved.
    #[builder]
    pub async fn collect(
        &self,
        countries: &[String],
        query: Option<IndicatorQuery>,
    ) -> Result<ResultTable, CollectorError> {
        let query = query.unwrap_or_default();
        let codes = resolve_countries(countries)?;
        info!("Collecting IHME indicator {:?} for {:?}", query, codes);

        let directory = self.client.locations().await?;
        let location_ids = match_locations(&codes, &directory);

        let mut table = ResultTable::new();
        for code in &codes {
            let average = match location_ids.get(code) {
                Some(&location_id) => self.client.estimate(location_id, &query).await?.into(),
                None => {
                    warn!("IHME lists no location for {}", code);
                    ParameterAverage::Absent
                }
            };
            table.insert(code, INDICATOR_COLUMN, average);
        }
        Ok(table)
    }

    /// Runs [`IndicatorCollector::collect`] with `collection.countries` and the `indicator`
    /// section of `config`.
    pub async fn collect_configured(&self, config: &Config) -> Result<ResultTable, CollectorError> {
        self.collect()
            .countries(&config.collection.countries)
            .query(config.indicator.to_query())
            .call()
            .await
    }
}

/// Maps each requested code to the first IHME location whose name resolves to it.
fn match_locations(codes: &[String], directory: &[IhmeLocation]) -> IndexMap<String, u64> {
    let mut ids = IndexMap::new();
    for location in directory {
        let Some(code) = alpha2_for(&location.location_name) else {
            continue;
        };
        if !codes.iter().any(|c| c == code) {
            continue;
        }
        if let Some(existing) = ids.get(code) {
            warn!(
                "IHME location {} ({}) also matches {}, keeping {}",
                location.location_id, location.location_name, code, existing
            );
            continue;
        }
        debug!(
            "Matched {} to IHME location {} ({})",
            code, location.location_id, location.location_name
        );
        ids.insert(code.to_string(), location.location_id);
    }
    ids
}
