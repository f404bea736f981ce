//! Defines the [`AnalysisWindow`] every coverage and aggregation decision is made against,
//! together with the timezone-naive timestamp parsing used for upstream datetimes.

use crate::error::CollectorError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open interval `[from, to)` of local, timezone-naive datetimes.
///
/// Upstream datetimes carry the station's UTC offset. All comparisons against a window use
/// the wall-clock part of those datetimes, so a window of `2024-01-01..2025-01-01` means the
/// same calendar span at every station regardless of its timezone.
///
/// # Examples
///
/// ```
/// use openaq_collect::AnalysisWindow;
/// use chrono::NaiveDate;
///
/// let window = AnalysisWindow::from_dates(
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
/// ).unwrap();
/// assert_eq!(window, AnalysisWindow::year(2024).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisWindow {
    from: NaiveDateTime,
    to: NaiveDateTime,
}

impl AnalysisWindow {
    /// Creates a window, rejecting empty or inverted intervals.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::InvalidWindow`] if `from >= to`.
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Result<Self, CollectorError> {
        if from >= to {
            return Err(CollectorError::InvalidWindow { from, to });
        }
        Ok(Self { from, to })
    }

    /// Window from midnight of `from` to midnight of `to`.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Result<Self, CollectorError> {
        Self::new(from.and_time(NaiveTime::MIN), to.and_time(NaiveTime::MIN))
    }

    /// The calendar year `year`, i.e. `[year-01-01, (year+1)-01-01)`.
    pub fn year(year: i32) -> Result<Self, CollectorError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1);
        let end = year
            .checked_add(1)
            .and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1));
        match (start, end) {
            (Some(start), Some(end)) => Self::from_dates(start, end),
            _ => Err(CollectorError::YearOutOfRange(year)),
        }
    }

    pub fn from(&self) -> NaiveDateTime {
        self.from
    }

    pub fn to(&self) -> NaiveDateTime {
        self.to
    }

    /// Whether the span `[start, end)` lies entirely within this window.
    pub fn contains_span(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start >= self.from && end <= self.to
    }

    /// Whether an observed span `[first, last]` fully covers this window.
    pub fn is_covered_by(&self, first: NaiveDateTime, last: NaiveDateTime) -> bool {
        first <= self.from && last >= self.to
    }
}

impl fmt::Display for AnalysisWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.from, self.to)
    }
}

/// Parses an upstream timestamp into its local wall-clock time, discarding any offset.
///
/// Accepts RFC 3339 (`2024-01-01T00:00:00+01:00`, `2024-01-01T00:00:00Z`) as well as
/// offset-less `2024-01-01T00:00:00` / `2024-01-01 00:00:00`.
pub fn parse_local_naive(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}
