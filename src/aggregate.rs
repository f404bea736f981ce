//! Reduces a sensor's yearly summaries to a single value for an analysis window.

use crate::api::client::OpenAqClient;
use crate::api::error::FetchError;
use crate::api::transport::Transport;
use crate::types::summary::YearlySummary;
use crate::types::window::{parse_local_naive, AnalysisWindow};
use log::{debug, warn};

/// Mean of the summaries whose period lies entirely inside `window`.
///
/// Summaries with a `null` value or an unparseable period are skipped. Returns `None` when
/// nothing qualifies; a missing measurement is never reported as zero.
pub fn average_within(summaries: &[YearlySummary], window: &AnalysisWindow) -> Option<f64> {
    let values: Vec<f64> = summaries
        .iter()
        .filter(|summary| period_within(summary, window))
        .filter_map(|summary| summary.value)
        .collect();

    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn period_within(summary: &YearlySummary, window: &AnalysisWindow) -> bool {
    let from = parse_local_naive(&summary.period.datetime_from.local);
    let to = parse_local_naive(&summary.period.datetime_to.local);
    match (from, to) {
        (Some(from), Some(to)) => window.contains_span(from, to),
        _ => {
            warn!(
                "Skipping summary with unparseable period {:?} .. {:?}",
                summary.period.datetime_from.local, summary.period.datetime_to.local
            );
            false
        }
    }
}

/// Fetches and reduces per-sensor yearly summaries.
pub struct MeasurementAggregator<'a, T> {
    client: &'a OpenAqClient<T>,
}

impl<'a, T: Transport> MeasurementAggregator<'a, T> {
    pub fn new(client: &'a OpenAqClient<T>) -> Self {
        Self { client }
    }

    /// The sensor's mean value over `window`, or `None` if no summary qualifies.
    pub async fn average_for_sensor(
        &self,
        sensor_id: u64,
        window: &AnalysisWindow,
    ) -> Result<Option<f64>, FetchError> {
        let summaries = self.client.sensor_years(sensor_id).await?;
        let average = average_within(&summaries, window);
        debug!(
            "Sensor {}: {} summaries, average within {} = {:?}",
            sensor_id,
            summaries.len(),
            window,
            average
        );
        Ok(average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::scripted::ScriptedTransport;
    use crate::types::location::Timestamp;
    use crate::types::summary::Period;
    use serde_json::json;

    fn summary(from: &str, to: &str, value: Option<f64>) -> YearlySummary {
        YearlySummary {
            period: Period {
                label: None,
                datetime_from: Timestamp {
                    utc: from.to_string(),
                    local: from.to_string(),
                },
                datetime_to: Timestamp {
                    utc: to.to_string(),
                    local: to.to_string(),
                },
            },
            value,
        }
    }

    fn window() -> AnalysisWindow {
        AnalysisWindow::new(
            parse_local_naive("2022-01-01T00:00:00").unwrap(),
            parse_local_naive("2025-01-01T00:00:00").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn averages_only_periods_inside_the_window() {
        let summaries = [
            summary("2021-01-01T00:00:00", "2022-01-01T00:00:00", Some(100.0)),
            summary("2022-01-01T00:00:00", "2023-01-01T00:00:00", Some(10.0)),
            summary("2023-01-01T00:00:00", "2024-01-01T00:00:00", Some(20.0)),
            summary("2024-01-01T00:00:00", "2025-01-01T00:00:00", Some(30.0)),
            summary("2024-06-01T00:00:00", "2025-06-01T00:00:00", Some(500.0)),
        ];
        assert_eq!(average_within(&summaries, &window()), Some(20.0));
    }

    #[test]
    fn empty_or_disjoint_summaries_are_absent() {
        assert_eq!(average_within(&[], &window()), None);
        let outside = [summary(
            "2019-01-01T00:00:00",
            "2020-01-01T00:00:00",
            Some(3.0),
        )];
        assert_eq!(average_within(&outside, &window()), None);
    }

    #[test]
    fn null_values_do_not_count_as_zero() {
        let summaries = [
            summary("2022-01-01T00:00:00", "2023-01-01T00:00:00", None),
            summary("2023-01-01T00:00:00", "2024-01-01T00:00:00", Some(12.0)),
        ];
        assert_eq!(average_within(&summaries, &window()), Some(12.0));

        let only_null = [summary(
            "2022-01-01T00:00:00",
            "2023-01-01T00:00:00",
            None,
        )];
        assert_eq!(average_within(&only_null, &window()), None);
    }

    #[test]
    fn local_offsets_are_ignored_when_filtering() {
        let summaries = [summary(
            "2022-01-01T00:00:00+09:00",
            "2023-01-01T00:00:00+09:00",
            Some(4.0),
        )];
        assert_eq!(average_within(&summaries, &window()), Some(4.0));
    }

    #[tokio::test]
    async fn fetches_and_averages_a_sensor() {
        let transport = ScriptedTransport::new();
        transport.push(
            "/sensors/5/years",
            200,
            json!({
                "meta": { "found": 2 },
                "results": [
                    { "period": { "datetimeFrom": { "utc": "", "local": "2022-01-01T00:00:00" }, "datetimeTo": { "utc": "", "local": "2023-01-01T00:00:00" } }, "value": 6.0 },
                    { "period": { "datetimeFrom": { "utc": "", "local": "2023-01-01T00:00:00" }, "datetimeTo": { "utc": "", "local": "2024-01-01T00:00:00" } }, "value": 8.0 }
                ]
            })
            .to_string(),
        );
        let client = OpenAqClient::with_transport(transport, "https://api.test/v3");
        let aggregator = MeasurementAggregator::new(&client);

        let average = aggregator.average_for_sensor(5, &window()).await.unwrap();

        assert_eq!(average, Some(7.0));
    }

    #[tokio::test]
    async fn sensor_without_summaries_is_absent() {
        let transport = ScriptedTransport::new();
        transport.push(
            "/sensors/5/years",
            200,
            json!({ "meta": { "found": 0 }, "results": [] }).to_string(),
        );
        let client = OpenAqClient::with_transport(transport, "https://api.test/v3");

        let average = MeasurementAggregator::new(&client)
            .average_for_sensor(5, &window())
            .await
            .unwrap();

        assert_eq!(average, None);
    }
}
