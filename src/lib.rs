mod aggregate;
mod api;
mod collector;
mod config;
mod countries;
mod coverage;
mod error;
mod indicators;
mod sampling;
mod types;

pub use error::CollectorError;
pub use collector::*;
pub use indicators::{IndicatorCollector, INDICATOR_COLUMN};

pub use api::client::*;
pub use api::error::FetchError;
pub use api::ihme::IhmeClient;
pub use api::paginate::*;
pub use api::transport::{HttpTransport, RawResponse, Transport};

pub use aggregate::{average_within, MeasurementAggregator};
pub use config::{CollectionConfig, Config, ConfigError, IndicatorConfig, RetryConfig};
pub use countries::{alpha2_for, name_for};
pub use coverage::{covering, covers};
pub use sampling::{SensorBuckets, SensorSampler};

pub use types::indicator::*;
pub use types::location::*;
pub use types::results::{ParameterAverage, ResultTable};
pub use types::summary::{Period, YearlySummary};
pub use types::window::{parse_local_naive, AnalysisWindow};
