//! This module provides [`Collector`], the entry point that turns a list of countries and an
//! analysis window into per-country parameter averages.
//!
//! For every country it lists all locations, drops those whose reporting window does not cover
//! the analysis window, samples at most `sensors_per_parameter` sensors per parameter, averages
//! each sampled sensor's yearly summaries and finally averages the sensors. Everything runs
//! sequentially.

use crate::aggregate::MeasurementAggregator;
use crate::api::client::OpenAqClient;
use crate::api::transport::{HttpTransport, Transport};
use crate::config::Config;
use crate::countries::resolve_countries;
use crate::coverage::covering;
use crate::error::CollectorError;
use crate::sampling::SensorSampler;
use crate::types::location::Location;
use crate::types::results::{ParameterAverage, ResultTable};
use crate::types::window::AnalysisWindow;
use bon::bon;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Mutex, PoisonError};

pub const DEFAULT_SENSORS_PER_PARAMETER: usize = 5;

/// Collects parameter averages per country from OpenAQ.
///
/// The random source used for sensor sampling is owned by the collector, so a collector built
/// with a seeded [`StdRng`] produces the same sample on every run.
///
/// # Examples
///
/// ```no_run
/// # use openaq_collect::{AnalysisWindow, Collector, CollectorError, OpenAqClient};
/// # use rand::SeedableRng;
/// # #[tokio::main]
/// # async fn main() -> Result<(), CollectorError> {
/// let client = OpenAqClient::connect("https://api.openaq.org/v3", "my-api-key")?;
/// let collector = Collector::new(client, rand::rngs::StdRng::seed_from_u64(42));
///
/// let table = collector
///     .collect()
///     .countries(&["Norway".to_string(), "Japan".to_string()])
///     .window(AnalysisWindow::year(2024)?)
///     .parameters(vec!["pm25".to_string(), "no2".to_string()])
///     .sensors_per_parameter(5)
///     .call()
///     .await?;
///
/// for (country, averages) in table.iter() {
///     println!("{country}: {averages:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Collector<T = HttpTransport> {
    client: OpenAqClient<T>,
    rng: Mutex<StdRng>,
}

impl Collector<HttpTransport> {
    /// Builds a collector talking to the API described by `config`.
    ///
    /// Uses `collection.seed` for sampling when set, a fresh entropy seed otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Config`] if the OpenAQ URL or key is missing, and
    /// [`CollectorError::Fetch`] if the HTTP client can't be built.
    pub fn from_config(config: &Config) -> Result<Self, CollectorError> {
        config.validate_openaq()?;
        let client = OpenAqClient::connect(&config.base_url, &config.api_key)?
            .page_size(config.collection.page_size)
            .retry_policy(config.retry.to_policy());
        let rng = match config.collection.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::new(client, rng))
    }
}

#[bon]
impl<T: Transport> Collector<T> {
    pub fn new(client: OpenAqClient<T>, rng: StdRng) -> Self {
        Self {
            client,
            rng: Mutex::new(rng),
        }
    }

    pub fn client(&self) -> &OpenAqClient<T> {
        &self.client
    }

    /// Collects one record per country.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.countries(&[String])`: **Required.** Country names or alpha-2 codes. Output follows this order; repeats are collected once.
    /// * `.window(AnalysisWindow)`: **Required.** The period locations must cover and summaries must fall in.
    /// * `.parameters(Vec<String>)`: Optional. Parameter allowlist. Every listed parameter appears in every record, as [`ParameterAverage::Absent`] when nothing qualified. Without it only parameters actually found are reported.
    /// * `.sensors_per_parameter(usize)`: Optional. Sample cap per parameter and country. Defaults to `5`.
    ///
    /// # Errors
    ///
    /// * [`CollectorError::UnknownCountry`] before any request is made, if a country can't be resolved.
    /// * [`CollectorError::Fetch`] if a listing can't be retrieved after the retry policy is exhausted.
    #[builder]
    pub async fn collect(
        &self,
        countries: &[String],
        window: AnalysisWindow,
        parameters: Option<Vec<String>>,
        sensors_per_parameter: Option<usize>,
    ) -> Result<ResultTable, CollectorError> {
        let parameters = parameters.unwrap_or_default();
        let cap = sensors_per_parameter.unwrap_or(DEFAULT_SENSORS_PER_PARAMETER);

        let codes = resolve_countries(countries)?;
        info!(
            "Collecting {:?} for {:?} over {} (at most {} sensors per parameter)",
            parameters, codes, window, cap
        );

        let sampler = SensorSampler::new(cap, parameters.clone());
        let aggregator = MeasurementAggregator::new(&self.client);
        let mut table = ResultTable::new();

        for code in &codes {
            table.add_country(code);

            let locations = self.client.locations(code).await?;
            let qualifying: Vec<&Location> = covering(&locations, &window)
                .filter(|location| {
                    let matches = location.country.code.eq_ignore_ascii_case(code);
                    if !matches {
                        warn!(
                            "Location {} reports country {} while listing {}, skipping",
                            location.id, location.country.code, code
                        );
                    }
                    matches
                })
                .collect();
            info!(
                "{}: {} of {} locations cover {}",
                code,
                qualifying.len(),
                locations.len(),
                window
            );

            let buckets = {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                sampler.sample(qualifying, &mut *rng)
            };

            for (parameter, sensors) in &buckets {
                let mut values = Vec::with_capacity(sensors.len());
                for sensor in sensors {
                    values.push(aggregator.average_for_sensor(sensor.id(), &window).await?);
                }
                let average = ParameterAverage::mean_of(values.iter().copied());
                debug!(
                    "{} {}: {} sensors, {} with data, average {}",
                    code,
                    parameter,
                    sensors.len(),
                    values.iter().flatten().count(),
                    average
                );
                table.insert(code, parameter, average);
            }

            for parameter in &parameters {
                if table.get(code, parameter).is_none() {
                    table.insert(code, parameter, ParameterAverage::Absent);
                }
            }
        }

        Ok(table)
    }

    /// Runs [`Collector::collect`] with the countries, window, allowlist and cap from `config`.
    pub async fn collect_configured(&self, config: &Config) -> Result<ResultTable, CollectorError> {
        let collection = &config.collection;
        self.collect()
            .countries(&collection.countries)
            .window(config.window()?)
            .parameters(collection.parameters.clone())
            .sensors_per_parameter(collection.sensors_per_parameter)
            .call()
            .await
    }
}
