//! YAML configuration for a collection run.
//!
//! Keys of the older `config.yaml` layout (`openaq_api_url`, `openaq_api_key`) are accepted as
//! aliases. The API keys may be left out of the file and supplied through `OPENAQ_API_KEY` and
//! `IHME_API_KEY`. Credentials are checked per data source, so a file serving only one of
//! them doesn't need the other's key.

use crate::api::client::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use crate::api::paginate::{
    RetryPolicy, DEFAULT_COOLDOWN, DEFAULT_ERROR_DELAY, DEFAULT_MAX_ERROR_RETRIES,
};
use crate::types::indicator::{
    IndicatorQuery, DEFAULT_AGE_GROUP_ID, DEFAULT_INDICATOR_ID, DEFAULT_SCENARIO, DEFAULT_SEX_ID,
    DEFAULT_YEAR,
};
use crate::types::window::AnalysisWindow;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const API_KEY_ENV: &str = "OPENAQ_API_KEY";
pub const IHME_API_KEY_ENV: &str = "IHME_API_KEY";
pub const OUTPUT_FILE_NAME: &str = "openaq_data.csv";
pub const IHME_OUTPUT_FILE_NAME: &str = "ihme_data.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// OpenAQ v3 base URL.
    #[serde(default = "default_base_url", alias = "openaq_api_url")]
    pub base_url: String,

    /// Value sent in the `X-API-Key` header.
    #[serde(default, alias = "openaq_api_key")]
    pub api_key: String,

    /// Directory the result CSV is written to.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// IHME API base URL, required only for health indicators.
    #[serde(default)]
    pub ihme_api_url: String,

    /// Value sent in the `Authorization` header to IHME.
    #[serde(default)]
    pub ihme_api_key: String,

    #[serde(default)]
    pub collection: CollectionConfig,

    #[serde(default)]
    pub indicator: IndicatorConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// What to collect.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    /// Country names or alpha-2 codes, in output order.
    #[serde(default = "default_countries")]
    pub countries: Vec<String>,

    #[serde(default = "default_date_from")]
    pub date_from: NaiveDate,

    #[serde(default = "default_date_to")]
    pub date_to: NaiveDate,

    /// Parameter allowlist. Empty collects every parameter found.
    #[serde(default = "default_parameters")]
    pub parameters: Vec<String>,

    #[serde(default = "default_sensors_per_parameter")]
    pub sensors_per_parameter: usize,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Seed for sensor sampling. Unset draws a fresh seed per run.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    #[serde(default)]
    pub max_rate_limit_retries: Option<u32>,

    #[serde(default = "default_max_error_retries")]
    pub max_error_retries: u32,

    #[serde(default = "default_error_delay_secs")]
    pub error_delay_secs: u64,

    #[serde(default)]
    pub max_pages: Option<u32>,
}

/// Which IHME indicator series to fetch for every country in `collection.countries`.
#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_indicator_id")]
    pub indicator_id: u32,
    #[serde(default = "default_year")]
    pub year: i32,
    #[serde(default = "default_sex_id")]
    pub sex_id: u32,
    #[serde(default = "default_age_group_id")]
    pub age_group_id: u32,
    #[serde(default = "default_scenario")]
    pub scenario: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_countries() -> Vec<String> {
    ["Norway", "Japan", "United Kingdom"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_date_from() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

fn default_date_to() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
}

fn default_parameters() -> Vec<String> {
    ["pm25", "pm10", "no2"].into_iter().map(String::from).collect()
}

fn default_sensors_per_parameter() -> usize {
    5
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN.as_secs()
}

fn default_max_error_retries() -> u32 {
    DEFAULT_MAX_ERROR_RETRIES
}

fn default_error_delay_secs() -> u64 {
    DEFAULT_ERROR_DELAY.as_secs()
}

fn default_indicator_id() -> u32 {
    DEFAULT_INDICATOR_ID
}

fn default_year() -> i32 {
    DEFAULT_YEAR
}

fn default_sex_id() -> u32 {
    DEFAULT_SEX_ID
}

fn default_age_group_id() -> u32 {
    DEFAULT_AGE_GROUP_ID
}

fn default_scenario() -> u32 {
    DEFAULT_SCENARIO
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            countries: default_countries(),
            date_from: default_date_from(),
            date_to: default_date_to(),
            parameters: default_parameters(),
            sensors_per_parameter: default_sensors_per_parameter(),
            page_size: default_page_size(),
            seed: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            max_rate_limit_retries: None,
            max_error_retries: default_max_error_retries(),
            error_delay_secs: default_error_delay_secs(),
            max_pages: None,
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            indicator_id: default_indicator_id(),
            year: default_year(),
            sex_id: default_sex_id(),
            age_group_id: default_age_group_id(),
            scenario: default_scenario(),
        }
    }
}

impl IndicatorConfig {
    pub fn to_query(&self) -> IndicatorQuery {
        IndicatorQuery::builder()
            .indicator_id(self.indicator_id)
            .year(self.year)
            .sex_id(self.sex_id)
            .age_group_id(self.age_group_id)
            .scenario(self.scenario)
            .build()
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .cooldown(Duration::from_secs(self.cooldown_secs))
            .maybe_max_rate_limit_retries(self.max_rate_limit_retries)
            .max_error_retries(self.max_error_retries)
            .error_delay(Duration::from_secs(self.error_delay_secs))
            .maybe_max_pages(self.max_pages)
            .build()
    }
}

impl Config {
    /// Loads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let mut config: Config = serde_yaml::from_str(&data)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;

        fill_from_env(&mut config.api_key, API_KEY_ENV);
        fill_from_env(&mut config.ihme_api_key, IHME_API_KEY_ENV);

        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency of the settings shared by both data sources.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let collection = &self.collection;
        if collection.countries.is_empty() {
            return Err(ConfigError::Invalid(
                "collection.countries must not be empty".into(),
            ));
        }
        if collection.page_size == 0 {
            return Err(ConfigError::Invalid(
                "collection.page_size must be positive".into(),
            ));
        }
        if collection.sensors_per_parameter == 0 {
            return Err(ConfigError::Invalid(
                "collection.sensors_per_parameter must be positive".into(),
            ));
        }
        if self.retry.max_pages == Some(0) {
            return Err(ConfigError::Invalid(
                "retry.max_pages must be positive when set".into(),
            ));
        }
        if collection.date_from >= collection.date_to {
            return Err(ConfigError::Invalid(format!(
                "collection.date_from ({}) must be before collection.date_to ({})",
                collection.date_from, collection.date_to
            )));
        }
        Ok(())
    }

    /// Checks that the OpenAQ endpoint and key are present.
    pub fn validate_openaq(&self) -> Result<(), ConfigError> {
        require(&self.base_url, "base_url is required")?;
        require(
            &self.api_key,
            &format!("api_key is required (or set {API_KEY_ENV})"),
        )
    }

    /// Checks that the IHME endpoint and key are present.
    pub fn validate_ihme(&self) -> Result<(), ConfigError> {
        require(&self.ihme_api_url, "ihme_api_url is required")?;
        require(
            &self.ihme_api_key,
            &format!("ihme_api_key is required (or set {IHME_API_KEY_ENV})"),
        )
    }

    /// The analysis window described by `collection.date_from` / `date_to`.
    pub fn window(&self) -> Result<AnalysisWindow, crate::error::CollectorError> {
        AnalysisWindow::from_dates(self.collection.date_from, self.collection.date_to)
    }

    pub fn output_path(&self) -> PathBuf {
        self.data_path.join(OUTPUT_FILE_NAME)
    }

    pub fn ihme_output_path(&self) -> PathBuf {
        self.data_path.join(IHME_OUTPUT_FILE_NAME)
    }
}

fn fill_from_env(value: &mut String, var: &str) {
    if value.trim().is_empty() {
        if let Ok(key) = std::env::var(var) {
            *value = key;
        }
    }
}

fn require(value: &str, message: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(message.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_legacy_keys_and_applies_defaults() {
        let file = write_config(
            "openaq_api_url: https://api.openaq.org/v3/\nopenaq_api_key: secret\ndata_path: out\n",
        );

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.base_url, "https://api.openaq.org/v3/");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.output_path(), PathBuf::from("out/openaq_data.csv"));
        assert_eq!(
            config.collection.countries,
            ["Norway", "Japan", "United Kingdom"]
        );
        assert_eq!(config.collection.parameters, ["pm25", "pm10", "no2"]);
        assert_eq!(config.collection.sensors_per_parameter, 5);
        assert_eq!(config.collection.page_size, 1000);
        assert_eq!(config.window().unwrap(), AnalysisWindow::year(2024).unwrap());
        assert_eq!(config.retry.to_policy(), RetryPolicy::default());
    }

    #[test]
    fn loads_full_collection_and_retry_sections() {
        let file = write_config(
            r#"
base_url: http://localhost:8080
api_key: k
collection:
  countries: [DE, France]
  date_from: 2022-06-01
  date_to: 2023-06-01
  parameters: []
  sensors_per_parameter: 2
  page_size: 100
  seed: 42
retry:
  cooldown_secs: 1
  max_rate_limit_retries: 5
  max_error_retries: 0
  error_delay_secs: 0
  max_pages: 10
"#,
        );

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.collection.countries, ["DE", "France"]);
        assert!(config.collection.parameters.is_empty());
        assert_eq!(config.collection.seed, Some(42));
        let policy = config.retry.to_policy();
        assert_eq!(policy.cooldown, Duration::from_secs(1));
        assert_eq!(policy.max_rate_limit_retries, Some(5));
        assert_eq!(policy.max_error_retries, 0);
        assert_eq!(policy.max_pages, Some(10));
    }

    #[test]
    fn rejects_inverted_dates_and_zero_sizes() {
        let inverted = write_config(
            "api_key: k\ncollection:\n  date_from: 2025-01-01\n  date_to: 2024-01-01\n",
        );
        assert!(matches!(
            Config::load(inverted.path()),
            Err(ConfigError::Invalid(_))
        ));

        let zero_cap = write_config("api_key: k\ncollection:\n  sensors_per_parameter: 0\n");
        assert!(matches!(
            Config::load(zero_cap.path()),
            Err(ConfigError::Invalid(_))
        ));

        let zero_pages = write_config("api_key: k\nretry:\n  max_pages: 0\n");
        assert!(matches!(
            Config::load(zero_pages.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn credentials_are_checked_per_source() {
        let file = write_config(
            "api_key: k\nihme_api_url: https://ihme.test/api/\nihme_api_key: ' '\n",
        );
        let config = Config::load(file.path()).unwrap();
        assert!(config.validate_openaq().is_ok());

        let mut ihme_only = config.clone();
        ihme_only.api_key = String::new();
        ihme_only.ihme_api_key = "token".into();
        assert!(ihme_only.validate_ihme().is_ok());
        assert!(matches!(
            ihme_only.validate_openaq(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn loads_indicator_section() {
        let file = write_config(
            "ihme_api_url: https://ihme.test/api/\nihme_api_key: t\nindicator:\n  indicator_id: 1002\n  sex_id: 1\n",
        );

        let config = Config::load(file.path()).unwrap();

        assert_eq!(
            config.ihme_output_path(),
            PathBuf::from("data/ihme_data.csv")
        );
        let query = config.indicator.to_query();
        assert_eq!(query.indicator_id, 1002);
        assert_eq!(query.sex_id, 1);
        assert_eq!(query.year, 2024);
        assert_eq!(query.age_group_id, 22);
        assert_eq!(query.scenario, 0);
    }

    #[test]
    fn reports_unreadable_and_malformed_files() {
        assert!(matches!(
            Config::load(Path::new("/definitely/not/here.yaml")),
            Err(ConfigError::Read(..))
        ));
        let malformed = write_config("collection: [unterminated");
        assert!(matches!(
            Config::load(malformed.path()),
            Err(ConfigError::Parse(..))
        ));
    }
}
