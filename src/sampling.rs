//! Groups sensors by measured parameter and caps each group through uniform sampling.
//!
//! Sampling happens only after every qualifying sensor has been bucketed, so each sensor
//! reporting a parameter has the same chance of being picked no matter which location hosts it.

use crate::types::location::{Location, SensorRef};
use indexmap::IndexMap;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

/// Sensors per parameter, keyed in first-discovery order.
pub type SensorBuckets<'a> = IndexMap<String, Vec<SensorRef<'a>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorSampler {
    cap: usize,
    allowlist: Vec<String>,
}

impl SensorSampler {
    /// `allowlist` restricts the accepted parameter names; an empty list accepts all.
    pub fn new(cap: usize, allowlist: Vec<String>) -> Self {
        Self { cap, allowlist }
    }

    /// Maximum number of sensors kept per parameter.
    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn accepts(&self, parameter: &str) -> bool {
        self.allowlist.is_empty() || self.allowlist.iter().any(|p| p == parameter)
    }

    /// Buckets every accepted sensor of `locations` under its parameter name.
    pub fn bucket<'a, I>(&self, locations: I) -> SensorBuckets<'a>
    where
        I: IntoIterator<Item = &'a Location>,
    {
        let mut buckets = SensorBuckets::new();
        for location in locations {
            for sensor in &location.sensors {
                if !self.accepts(&sensor.parameter.name) {
                    continue;
                }
                buckets
                    .entry(sensor.parameter.name.clone())
                    .or_default()
                    .push(SensorRef { sensor, location });
            }
        }
        buckets
    }

    /// Buckets the sensors of `locations` and caps every bucket at `cap` sensors.
    ///
    /// Buckets within the cap are returned unchanged. Larger ones are replaced by `cap`
    /// distinct sensors drawn uniformly without replacement.
    pub fn sample<'a, I, R>(&self, locations: I, rng: &mut R) -> SensorBuckets<'a>
    where
        I: IntoIterator<Item = &'a Location>,
        R: Rng + ?Sized,
    {
        let mut buckets = self.bucket(locations);
        for (parameter, sensors) in buckets.iter_mut() {
            if sensors.len() <= self.cap {
                continue;
            }
            debug!(
                "Sampling {} of {} sensors for {}",
                self.cap,
                sensors.len(),
                parameter
            );
            *sensors = sensors.choose_multiple(rng, self.cap).copied().collect();
        }
        buckets
    }
}
