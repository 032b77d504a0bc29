//! Resolution of `since`/`until` log bounds.
//!
//! A bound is Unix seconds (`1700000000`, fractions allowed), an RFC 3339
//! time, or a relative duration such as `10m` or `1h30m` counted back from
//! now. Anything else leaves the bound open.

use chrono::{DateTime, Duration, Utc};

/// Resolves a bound to Unix seconds.
#[must_use]
pub fn resolve_bound(value: &str, now: DateTime<Utc>) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(secs) = value.parse::<i64>() {
        return Some(secs);
    }
    if let Ok(secs) = value.parse::<f64>() {
        if secs.is_finite() {
            return Some(secs.floor() as i64);
        }
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.timestamp());
    }
    parse_duration(value).map(|ago| (now - ago).timestamp())
}

/// Parses a duration made of number/unit pairs (`ns`, `us`, `ms`, `s`, `m`, `h`).
#[must_use]
pub fn parse_duration(value: &str) -> Option<Duration> {
    let mut rest = value;
    let mut total_nanos = 0_f64;
    if rest.is_empty() {
        return None;
    }

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let number: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total_nanos += number * scale;
    }

    if !total_nanos.is_finite() || total_nanos > i64::MAX as f64 {
        return None;
    }
    Some(Duration::nanoseconds(total_nanos as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test_case("1700000000", Some(1_700_000_000) ; "unix seconds")]
    #[test_case("1700000000.75", Some(1_700_000_000) ; "fractional seconds")]
    #[test_case("2024-01-01T11:00:00Z", Some(now().timestamp() - 3600) ; "rfc3339")]
    #[test_case("10m", Some(now().timestamp() - 600) ; "minutes ago")]
    #[test_case("1h30m", Some(now().timestamp() - 5400) ; "compound")]
    #[test_case("1.5h", Some(now().timestamp() - 5400) ; "fractional hours")]
    #[test_case("", None ; "empty")]
    #[test_case("yesterday", None ; "word")]
    #[test_case("10x", None ; "unknown unit")]
    fn resolves_bound(value: &str, expected: Option<i64>) {
        assert_eq!(resolve_bound(value, now()), expected);
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration("250ms"), Some(Duration::milliseconds(250)));
        assert_eq!(parse_duration("2h"), Some(Duration::hours(2)));
        assert_eq!(parse_duration("90s"), Some(Duration::seconds(90)));
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("5"), None);
    }
}
