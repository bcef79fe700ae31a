use chrono::{DateTime, Utc};
use chrono_tz::Europe::Oslo;

/// Shown when an instant cannot be formatted
pub const INVALID_TIME: &str = "--:--";

/// Parse an ISO 8601 / RFC 3339 instant, e.g. "2026-02-22T11:10:00+01:00"
pub fn parse_instant(input: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format an instant as `HH:mm` in Norwegian local time
pub fn format_local_time(input: &str) -> String {
    match parse_instant(input) {
        Some(instant) => instant.with_timezone(&Oslo).format("%H:%M").to_string(),
        None => INVALID_TIME.to_string(),
    }
}

/// Whole minutes from `now` until `departure`, rounded and never negative.
/// Unparsable input counts as departing now.
pub fn minutes_until(departure: &str, now: DateTime<Utc>) -> i64 {
    let Some(departure) = parse_instant(departure) else {
        return 0;
    };

    let millis = departure.signed_duration_since(now).num_milliseconds();
    let minutes = (millis as f64 / 60_000.0).round() as i64;
    minutes.max(0)
}

/// Human label for a minute count: "Nå", "7 min", "1t", "1t 27m"
pub fn format_minutes_label(minutes: i64) -> String {
    if minutes <= 0 {
        return "Nå".to_string();
    }

    if minutes >= 60 {
        let hours = minutes / 60;
        let rest = minutes % 60;
        return if rest == 0 {
            format!("{}t", hours)
        } else {
            format!("{}t {}m", hours, rest)
        };
    }

    format!("{} min", minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        parse_instant(s).unwrap()
    }

    #[test]
    fn formats_oslo_time_in_winter_and_summer() {
        assert_eq!(format_local_time("2026-02-22T10:05:00.000Z"), "11:05");
        assert_eq!(format_local_time("2026-07-01T10:05:00Z"), "12:05");
        assert_eq!(format_local_time("2026-02-22T23:30:00+01:00"), "23:30");
    }

    #[test]
    fn invalid_instant_formats_as_sentinel() {
        assert_eq!(format_local_time("not a date"), INVALID_TIME);
        assert_eq!(format_local_time(""), INVALID_TIME);
    }

    #[test]
    fn calculates_non_negative_minute_difference() {
        let now = at("2026-02-22T10:00:00.000Z");
        assert_eq!(minutes_until("2026-02-22T10:12:00.000Z", now), 12);
        assert_eq!(minutes_until("2026-02-22T09:40:00.000Z", now), 0);
        assert_eq!(minutes_until("garbage", now), 0);
    }

    #[test]
    fn rounds_to_nearest_minute() {
        let now = at("2026-02-22T10:00:00Z");
        assert_eq!(minutes_until("2026-02-22T10:04:29Z", now), 4);
        assert_eq!(minutes_until("2026-02-22T10:04:30Z", now), 5);
        assert_eq!(minutes_until("2026-02-22T11:04:00+01:00", now), 4);
    }

    #[test]
    fn formats_minute_labels() {
        assert_eq!(format_minutes_label(-3), "Nå");
        assert_eq!(format_minutes_label(0), "Nå");
        assert_eq!(format_minutes_label(7), "7 min");
        assert_eq!(format_minutes_label(59), "59 min");
        assert_eq!(format_minutes_label(60), "1t");
        assert_eq!(format_minutes_label(87), "1t 27m");
        assert_eq!(format_minutes_label(120), "2t");
    }
}
