use crate::api::error::FetchError;
use crate::config::ConfigError;
use chrono::NaiveDateTime;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unknown country '{0}', expected an ISO 3166 name or alpha-2 code")]
    UnknownCountry(String),

    #[error("Analysis window must start before it ends (from {from}, to {to})")]
    InvalidWindow {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },

    #[error("Year {0} is outside the supported date range")]
    YearOutOfRange(i32),

    #[error("Failed to build result table")]
    Frame(#[source] PolarsError),

    #[error("Failed to write output '{0}'")]
    OutputIo(PathBuf, #[source] std::io::Error),
}
