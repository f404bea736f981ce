use crate::types::location::Timestamp;
use serde::{Deserialize, Serialize};

/// One pre-aggregated measurement for a sub-period of a sensor's history,
/// as returned by `/sensors/{id}/years`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearlySummary {
    pub period: Period,
    /// `null` upstream when the period holds no valid measurements.
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    #[serde(default)]
    pub label: Option<String>,
    pub datetime_from: Timestamp,
    pub datetime_to: Timestamp,
}
