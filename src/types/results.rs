//! The result table produced by a collection run and its tabular/CSV representation.

use crate::error::CollectorError;
use indexmap::IndexMap;
use log::info;
use polars::prelude::{Column, CsvWriter, DataFrame, SerWriter};
use std::fmt;
use std::fs::{self, File};
use std::path::Path;

/// Number of decimals written to the CSV output.
const OUTPUT_DECIMALS: i32 = 3;

/// The reduced value for one (country, parameter) pair.
///
/// `Absent` means no sampled sensor had a qualifying summary. It is never folded into an
/// average and is written as an empty cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterAverage {
    Value(f64),
    Absent,
}

impl ParameterAverage {
    /// Arithmetic mean of the present values, `Absent` if there are none.
    pub fn mean_of<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let (sum, count) = values
            .into_iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            ParameterAverage::Absent
        } else {
            ParameterAverage::Value(sum / count as f64)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            ParameterAverage::Value(v) => Some(*v),
            ParameterAverage::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ParameterAverage::Absent)
    }
}

impl From<Option<f64>> for ParameterAverage {
    fn from(value: Option<f64>) -> Self {
        value.map_or(ParameterAverage::Absent, ParameterAverage::Value)
    }
}

impl fmt::Display for ParameterAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterAverage::Value(v) => write!(f, "{v}"),
            ParameterAverage::Absent => write!(f, "absent"),
        }
    }
}

/// Per-country parameter averages in insertion order.
///
/// Countries keep the order they were requested in; parameters keep the order they were
/// first discovered in for that country.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: IndexMap<String, IndexMap<String, ParameterAverage>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty record for `country` if none exists yet.
    pub fn add_country(&mut self, country: &str) {
        self.rows.entry(country.to_string()).or_default();
    }

    /// Sets the average of `parameter` for `country`, adding the country if needed.
    ///
    /// A parameter that is already present keeps its position and takes the new value.
    pub fn insert(&mut self, country: &str, parameter: &str, average: ParameterAverage) {
        self.rows
            .entry(country.to_string())
            .or_default()
            .insert(parameter.to_string(), average);
    }

    /// The recorded average for one cell.
    ///
    /// # Returns
    ///
    /// `None` if the country or parameter was never recorded. A recorded absence is
    /// `Some(ParameterAverage::Absent)`.
    pub fn get(&self, country: &str, parameter: &str) -> Option<ParameterAverage> {
        self.rows.get(country)?.get(parameter).copied()
    }

    /// All parameter averages of one country, in their recorded order.
    pub fn country(&self, country: &str) -> Option<&IndexMap<String, ParameterAverage>> {
        self.rows.get(country)
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexMap<String, ParameterAverage>)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of all parameter names over every record, in first-seen order.
    pub fn parameters(&self) -> Vec<&str> {
        let mut seen: IndexMap<&str, ()> = IndexMap::new();
        for averages in self.rows.values() {
            for parameter in averages.keys() {
                seen.insert(parameter.as_str(), ());
            }
        }
        seen.into_keys().collect()
    }

    /// Builds a `country` column followed by one nullable `f64` column per parameter.
    /// Values are rounded to three decimals.
    pub fn to_frame(&self) -> Result<DataFrame, CollectorError> {
        let parameters = self.parameters();
        let mut columns = Vec::with_capacity(parameters.len() + 1);

        let countries: Vec<String> = self.rows.keys().cloned().collect();
        columns.push(Column::new("country".into(), countries));

        for parameter in parameters {
            let values: Vec<Option<f64>> = self
                .rows
                .values()
                .map(|averages| {
                    averages
                        .get(parameter)
                        .and_then(ParameterAverage::value)
                        .map(round_output)
                })
                .collect();
            columns.push(Column::new(parameter.into(), values));
        }

        DataFrame::new(columns).map_err(CollectorError::Frame)
    }

    /// Writes the table as CSV with a header row, creating parent directories as needed.
    pub fn write_csv(&self, path: &Path) -> Result<(), CollectorError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CollectorError::OutputIo(parent.to_path_buf(), e))?;
        }
        let mut frame = self.to_frame()?;
        let mut file =
            File::create(path).map_err(|e| CollectorError::OutputIo(path.to_path_buf(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut frame)
            .map_err(CollectorError::Frame)?;
        info!(
            "Wrote {} country records with {} columns to {}",
            frame.height(),
            frame.width(),
            path.display()
        );
        Ok(())
    }
}

fn round_output(value: f64) -> f64 {
    let factor = 10f64.powi(OUTPUT_DECIMALS);
    (value * factor).round() / factor
}
