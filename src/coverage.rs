//! Decides whether a location reported for long enough to be used for an analysis window.

use crate::types::location::{Location, Timestamp};
use crate::types::window::{parse_local_naive, AnalysisWindow};
use chrono::NaiveDateTime;
use log::debug;

/// True iff the location's observed span `[datetimeFirst, datetimeLast]` fully contains
/// `window`. Locations missing either boundary, or with an unparseable one, never qualify.
pub fn covers(location: &Location, window: &AnalysisWindow) -> bool {
    let (Some(first), Some(last)) = (
        boundary(location.datetime_first.as_ref()),
        boundary(location.datetime_last.as_ref()),
    ) else {
        debug!(
            "Location {} has no usable reporting window, skipping",
            location.id
        );
        return false;
    };
    window.is_covered_by(first, last)
}

/// Locations that fully cover `window`, in their original order.
pub fn covering<'a>(
    locations: &'a [Location],
    window: &'a AnalysisWindow,
) -> impl Iterator<Item = &'a Location> + 'a {
    locations.iter().filter(move |location| covers(location, window))
}

fn boundary(timestamp: Option<&Timestamp>) -> Option<NaiveDateTime> {
    parse_local_naive(&timestamp?.local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::location::Country;
    use chrono::{Duration, NaiveDate};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn stamp(dt: NaiveDateTime) -> Timestamp {
        Timestamp {
            utc: format!("{}Z", dt.format("%Y-%m-%dT%H:%M:%S")),
            local: format!("{}+02:00", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }

    fn location(first: Option<NaiveDateTime>, last: Option<NaiveDateTime>) -> Location {
        Location {
            id: 1,
            name: None,
            country: Country {
                code: "NO".to_string(),
                name: None,
            },
            coordinates: None,
            datetime_first: first.map(stamp),
            datetime_last: last.map(stamp),
            sensors: Vec::new(),
        }
    }

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn missing_boundaries_never_cover() {
        let window = AnalysisWindow::year(2024).unwrap();
        let early = base();
        let late = base() + Duration::days(3650);
        assert!(!covers(&location(None, Some(late)), &window));
        assert!(!covers(&location(Some(early), None), &window));
        assert!(!covers(&location(None, None), &window));
        assert!(covers(&location(Some(early), Some(late)), &window));
    }

    #[test]
    fn exact_boundaries_cover() {
        let window = AnalysisWindow::year(2024).unwrap();
        assert!(covers(
            &location(Some(window.from()), Some(window.to())),
            &window
        ));
        assert!(!covers(
            &location(
                Some(window.from() + Duration::seconds(1)),
                Some(window.to())
            ),
            &window
        ));
        assert!(!covers(
            &location(
                Some(window.from()),
                Some(window.to() - Duration::seconds(1))
            ),
            &window
        ));
    }

    #[test]
    fn overlap_is_not_coverage() {
        let window = AnalysisWindow::year(2024).unwrap();
        let first = window.from() + Duration::days(30);
        let last = window.to() + Duration::days(30);
        assert!(!covers(&location(Some(first), Some(last)), &window));
    }

    #[test]
    fn unparseable_boundary_does_not_cover() {
        let window = AnalysisWindow::year(2024).unwrap();
        let mut loc = location(Some(base()), Some(base() + Duration::days(3650)));
        loc.datetime_last.as_mut().unwrap().local = "not a date".to_string();
        assert!(!covers(&loc, &window));
    }

    #[test]
    fn randomized_windows_match_containment_rule() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let offset = |rng: &mut StdRng| Duration::hours(rng.gen_range(0..2_000));
            let from = base() + offset(&mut rng);
            let to = from + Duration::hours(rng.gen_range(1..2_000));
            let window = AnalysisWindow::new(from, to).unwrap();

            // Bias toward equality with the window edges.
            let first = match rng.gen_range(0..3) {
                0 => from,
                _ => base() + offset(&mut rng),
            };
            let last = match rng.gen_range(0..3) {
                0 => to,
                _ => first + offset(&mut rng),
            };

            let expected = first <= from && last >= to;
            assert_eq!(
                covers(&location(Some(first), Some(last)), &window),
                expected,
                "first={first} last={last} window={window}"
            );
        }
    }

    #[test]
    fn covering_keeps_input_order() {
        let window = AnalysisWindow::year(2024).unwrap();
        let early = base();
        let late = base() + Duration::days(3650);
        let mut locations = vec![
            location(Some(early), Some(late)),
            location(None, Some(late)),
            location(Some(early), Some(late)),
        ];
        locations[0].id = 10;
        locations[2].id = 30;
        let ids: Vec<u64> = covering(&locations, &window).map(|l| l.id).collect();
        assert_eq!(ids, [10, 30]);
    }
}
