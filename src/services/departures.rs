use chrono::{DateTime, Utc};

use crate::models::Departure;
use crate::providers::entur::RawCall;
use crate::routes::RouteDirection;
use crate::services::{matcher, time};

pub const UNKNOWN_DESTINATION: &str = "Ukjent destinasjon";
pub const UNKNOWN_QUAY: &str = "Ukjent";

/// A call that survived validation but has no display fields yet
#[derive(Debug, Clone)]
struct Candidate {
    instant: DateTime<Utc>,
    departure_time_iso: String,
    destination: String,
    quay: String,
    realtime: bool,
}

fn trimmed_or(value: Option<&str>, sentinel: &str) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(sentinel)
        .to_string()
}

/// Returns `None` when the call has no usable departure time
fn to_candidate(call: &RawCall) -> Option<Candidate> {
    let departure_time_iso = call
        .expected_departure_time
        .as_deref()
        .or(call.aimed_departure_time.as_deref())
        .filter(|s| !s.is_empty())?;

    let instant = time::parse_instant(departure_time_iso)?;

    Some(Candidate {
        instant,
        departure_time_iso: departure_time_iso.to_string(),
        destination: trimmed_or(call.destination_front_text.as_deref(), UNKNOWN_DESTINATION),
        quay: trimmed_or(call.quay_name.as_deref(), UNKNOWN_QUAY),
        realtime: call.realtime.unwrap_or(false),
    })
}

/// Turn raw upstream calls into the departures shown for one direction.
///
/// Calls without a valid time are dropped, the rest are sorted by departure,
/// narrowed to the direction's destination aliases and capped at `limit`.
pub fn build_departures(
    calls: &[RawCall],
    direction: &RouteDirection,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<Departure> {
    let mut candidates: Vec<Candidate> = calls.iter().filter_map(to_candidate).collect();

    // sort_by_key is stable, so equal instants keep upstream order
    candidates.sort_by_key(|c| c.instant);

    candidates
        .into_iter()
        .filter(|c| matcher::matches(&c.destination, direction.destination_aliases))
        .take(limit)
        .map(|c| Departure {
            display_time: time::format_local_time(&c.departure_time_iso),
            minutes_until: time::minutes_until(&c.departure_time_iso, now),
            departure_time_iso: c.departure_time_iso,
            destination: c.destination,
            quay: c.quay,
            realtime: c.realtime,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{self, DirectionKey, RouteKey};

    fn now() -> DateTime<Utc> {
        time::parse_instant("2026-02-22T10:00:00.000Z").unwrap()
    }

    fn call(expected: &str, destination: &str) -> RawCall {
        RawCall {
            expected_departure_time: Some(expected.to_string()),
            destination_front_text: Some(destination.to_string()),
            quay_name: Some("1".to_string()),
            realtime: Some(true),
            ..Default::default()
        }
    }

    fn halhjem_to_sandvikvag() -> &'static RouteDirection {
        routes::direction(RouteKey::HalhjemSandvikvag, DirectionKey::HalhjemToSandvikvag).unwrap()
    }

    #[test]
    fn normalizes_and_filters_estimated_calls() {
        let calls = vec![
            RawCall {
                expected_departure_time: Some("2026-02-22T10:10:00.000Z".to_string()),
                destination_front_text: Some("Sandvikvåg".to_string()),
                quay_name: Some("1".to_string()),
                realtime: Some(true),
                ..Default::default()
            },
            RawCall {
                expected_departure_time: Some("2026-02-22T10:05:00.000Z".to_string()),
                destination_front_text: Some("Bergen".to_string()),
                quay_name: Some("2".to_string()),
                realtime: Some(false),
                ..Default::default()
            },
        ];

        let departures = build_departures(&calls, halhjem_to_sandvikvag(), 6, now());

        assert_eq!(departures.len(), 1);
        assert!(departures[0].destination.contains("Sandvik"));
        assert_eq!(departures[0].minutes_until, 10);
        assert_eq!(departures[0].display_time, "11:10");
        assert!(departures[0].realtime);
    }

    #[test]
    fn returns_empty_when_nothing_matches_direction() {
        let direction =
            routes::direction(RouteKey::ArsvagenMortavika, DirectionKey::ArsvagenToMortavika).unwrap();
        let calls = vec![call("2026-02-22T10:10:00.000Z", "Stavanger")];
        assert!(build_departures(&calls, direction, 6, now()).is_empty());
        assert!(build_departures(&[], direction, 6, now()).is_empty());
    }

    #[test]
    fn prefers_expected_over_aimed_time() {
        let calls = vec![RawCall {
            aimed_departure_time: Some("2026-02-22T10:05:00Z".to_string()),
            expected_departure_time: Some("2026-02-22T10:08:00Z".to_string()),
            destination_front_text: Some("Sandvikvåg".to_string()),
            ..Default::default()
        }];

        let departures = build_departures(&calls, halhjem_to_sandvikvag(), 6, now());
        assert_eq!(departures[0].departure_time_iso, "2026-02-22T10:08:00Z");
        assert_eq!(departures[0].minutes_until, 8);
    }

    #[test]
    fn falls_back_to_aimed_time() {
        let calls = vec![RawCall {
            aimed_departure_time: Some("2026-02-22T10:20:00Z".to_string()),
            destination_front_text: Some("Sandvikvag".to_string()),
            ..Default::default()
        }];

        let departures = build_departures(&calls, halhjem_to_sandvikvag(), 6, now());
        assert_eq!(departures.len(), 1);
        assert_eq!(departures[0].departure_time_iso, "2026-02-22T10:20:00Z");
        assert!(!departures[0].realtime);
    }

    #[test]
    fn drops_calls_without_a_valid_time() {
        let calls = vec![
            RawCall {
                destination_front_text: Some("Sandvikvåg".to_string()),
                ..Default::default()
            },
            call("tomorrow-ish", "Sandvikvåg"),
            RawCall {
                // expected is chosen even though aimed would have parsed
                expected_departure_time: Some("nope".to_string()),
                aimed_departure_time: Some("2026-02-22T10:30:00Z".to_string()),
                destination_front_text: Some("Sandvikvåg".to_string()),
                ..Default::default()
            },
            call("2026-02-22T10:40:00Z", "Sandvikvåg"),
        ];

        let departures = build_departures(&calls, halhjem_to_sandvikvag(), 6, now());
        assert_eq!(departures.len(), 1);
        assert_eq!(departures[0].departure_time_iso, "2026-02-22T10:40:00Z");
    }

    #[test]
    fn fills_missing_fields_with_sentinels() {
        let direction =
            routes::direction(RouteKey::ArsvagenMortavika, DirectionKey::ArsvagenToMortavika).unwrap();
        let calls = vec![RawCall {
            expected_departure_time: Some("2026-02-22T10:10:00Z".to_string()),
            destination_front_text: Some("   ".to_string()),
            quay_name: Some("  ".to_string()),
            ..Default::default()
        }];

        // the sentinel itself never matches a real alias, so the call is filtered out
        assert!(build_departures(&calls, direction, 6, now()).is_empty());

        let candidate = to_candidate(&calls[0]).unwrap();
        assert_eq!(candidate.destination, UNKNOWN_DESTINATION);
        assert_eq!(candidate.quay, UNKNOWN_QUAY);
        assert!(!candidate.realtime);
    }

    #[test]
    fn trims_destination_and_quay() {
        let calls = vec![RawCall {
            expected_departure_time: Some("2026-02-22T10:10:00Z".to_string()),
            destination_front_text: Some("  Sandvikvåg ferjekai ".to_string()),
            quay_name: Some(" Halhjem ferjekai ".to_string()),
            ..Default::default()
        }];

        let departures = build_departures(&calls, halhjem_to_sandvikvag(), 6, now());
        assert_eq!(departures[0].destination, "Sandvikvåg ferjekai");
        assert_eq!(departures[0].quay, "Halhjem ferjekai");
    }

    #[test]
    fn sorts_chronologically_and_keeps_ties_in_input_order() {
        let mut first_tie = call("2026-02-22T10:30:00Z", "Sandvikvåg");
        first_tie.quay_name = Some("A".to_string());
        let mut second_tie = call("2026-02-22T11:30:00+01:00", "Sandvikvag");
        second_tie.quay_name = Some("B".to_string());

        let calls = vec![
            call("2026-02-22T10:50:00Z", "Sandvikvåg"),
            first_tie,
            call("2026-02-22T10:15:00Z", "Sandvikvåg"),
            second_tie,
        ];

        let departures = build_departures(&calls, halhjem_to_sandvikvag(), 6, now());
        let minutes: Vec<i64> = departures.iter().map(|d| d.minutes_until).collect();
        assert_eq!(minutes, vec![15, 30, 30, 50]);
        assert_eq!(departures[1].quay, "A");
        assert_eq!(departures[2].quay, "B");
    }

    #[test]
    fn limit_is_applied_after_filtering() {
        let mut calls = Vec::new();
        for i in 0..10 {
            calls.push(call(&format!("2026-02-22T10:{:02}:00Z", i * 2), "Bergen"));
        }
        for i in 0..5 {
            calls.push(call(&format!("2026-02-22T11:{:02}:00Z", i * 5), "Sandvikvåg"));
        }

        let departures = build_departures(&calls, halhjem_to_sandvikvag(), 3, now());
        assert_eq!(departures.len(), 3);
        assert!(departures.iter().all(|d| d.destination == "Sandvikvåg"));
        assert!(departures
            .windows(2)
            .all(|w| time::parse_instant(&w[0].departure_time_iso) <= time::parse_instant(&w[1].departure_time_iso)));

        assert!(build_departures(&calls, halhjem_to_sandvikvag(), 0, now()).is_empty());
    }

    #[test]
    fn past_departures_report_zero_minutes() {
        let calls = vec![call("2026-02-22T09:58:00Z", "Sandvikvåg")];
        let departures = build_departures(&calls, halhjem_to_sandvikvag(), 6, now());
        assert_eq!(departures[0].minutes_until, 0);
    }
}
