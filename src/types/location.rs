//! Data structures for OpenAQ monitoring locations and the sensors attached to them,
//! as returned by the `/locations` listing endpoint.

use serde::{Deserialize, Serialize};

/// A monitoring site reporting one or more sensor parameters.
///
/// Unknown upstream fields are ignored during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// The OpenAQ location identifier.
    pub id: u64,
    /// Human readable site name, if the provider supplies one.
    #[serde(default)]
    pub name: Option<String>,
    /// Country the site is located in.
    pub country: Country,
    /// Geographical position of the site.
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// Earliest reported observation, `null` when the site never reported.
    #[serde(default)]
    pub datetime_first: Option<Timestamp>,
    /// Latest reported observation, `null` when the site never reported.
    #[serde(default)]
    pub datetime_last: Option<Timestamp>,
    /// Measurement channels at this site, in upstream order.
    #[serde(default)]
    pub sensors: Vec<Sensor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Country {
    /// ISO 3166-1 alpha-2 code, e.g. "NO".
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// An upstream datetime, reported both in UTC and in the site's local time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timestamp {
    pub utc: String,
    pub local: String,
}

/// A single measurement channel at a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sensor {
    /// Opaque OpenAQ sensor identifier.
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub parameter: Parameter,
}

/// The pollutant or indicator a sensor measures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Short name such as "pm25" or "no2".
    pub name: String,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A sensor together with the location hosting it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRef<'a> {
    pub sensor: &'a Sensor,
    pub location: &'a Location,
}

impl SensorRef<'_> {
    pub fn id(&self) -> u64 {
        self.sensor.id
    }

    pub fn parameter(&self) -> &str {
        &self.sensor.parameter.name
    }
}
