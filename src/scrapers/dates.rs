//! Date text shared by the site schemas: relative phrases and absolute layouts.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static AGO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+|an?|one)\s+(seconds?|secs?|minutes?|mins?|hours?|hrs?|days?|weeks?)\s+ago$")
        .expect("static regex")
});

static DAY_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(today|yesterday)(?:\s*,\s*|\s+at\s+|\s+)(\d{1,2}):(\d{2})$")
        .expect("static regex")
});

/// Datetime layouts seen across news sites, tried in order.
pub const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y, %H:%M",
    "%d/%m/%Y %H:%M",
    "%B %d, %Y %H:%M",
    "%b %d, %Y %H:%M",
];

/// Date-only layouts; these resolve to midnight.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%B %d, %Y", "%b %d, %Y"];

/// Resolve phrases like `3 hours ago`, `just now` or `yesterday, 14:05`.
pub fn parse_relative(raw: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("just now") || raw.eq_ignore_ascii_case("now") {
        return Some(now);
    }

    if let Some(caps) = AGO.captures(raw) {
        let amount = match caps[1].to_ascii_lowercase().as_str() {
            "a" | "an" | "one" => 1,
            digits => digits.parse::<i64>().ok()?,
        };
        let unit = caps[2].to_ascii_lowercase();
        let delta = if unit.starts_with("sec") {
            Duration::try_seconds(amount)?
        } else if unit.starts_with("min") {
            Duration::try_minutes(amount)?
        } else if unit.starts_with('h') {
            Duration::try_hours(amount)?
        } else if unit.starts_with('d') {
            Duration::try_days(amount)?
        } else {
            Duration::try_weeks(amount)?
        };
        return now.checked_sub_signed(delta);
    }

    if let Some(caps) = DAY_AT.captures(raw) {
        let hour: u32 = caps[2].parse().ok()?;
        let minute: u32 = caps[3].parse().ok()?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        let day = if caps[1].eq_ignore_ascii_case("yesterday") {
            now.date().pred_opt()?
        } else {
            now.date()
        };
        return Some(day.and_time(time));
    }

    None
}

/// Parse an absolute date with RFC 3339 first, then each layout in turn.
///
/// RFC 3339 values keep their local wall-clock time; the offset is dropped.
pub fn parse_absolute(raw: &str, datetime_formats: &[&str], date_formats: &[&str]) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    datetime_formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            date_formats
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_relative_ago() {
        assert_eq!(parse_relative("3 hours ago", now()), Some(at(2025, 5, 6, 9, 0)));
        assert_eq!(parse_relative("an hour ago", now()), Some(at(2025, 5, 6, 11, 0)));
        assert_eq!(parse_relative("45 mins ago", now()), Some(at(2025, 5, 6, 11, 15)));
        assert_eq!(parse_relative("2 days ago", now()), Some(at(2025, 5, 4, 12, 0)));
        assert_eq!(parse_relative("1 week ago", now()), Some(at(2025, 4, 29, 12, 0)));
        assert_eq!(parse_relative("Just now", now()), Some(now()));
    }

    #[test]
    fn test_relative_day_at() {
        assert_eq!(parse_relative("today, 08:15", now()), Some(at(2025, 5, 6, 8, 15)));
        assert_eq!(parse_relative("Yesterday at 23:40", now()), Some(at(2025, 5, 5, 23, 40)));
        assert_eq!(parse_relative("yesterday, 25:00", now()), None);
    }

    #[test]
    fn test_relative_rejects_other_text() {
        assert_eq!(parse_relative("sometime soon", now()), None);
        assert_eq!(parse_relative("2025-05-06", now()), None);
    }

    #[test]
    fn test_absolute_layouts() {
        let parse = |raw| parse_absolute(raw, DATETIME_FORMATS, DATE_FORMATS);
        assert_eq!(parse("2025-05-06T14:30:00+02:00"), Some(at(2025, 5, 6, 14, 30)));
        assert_eq!(parse("2025-05-06T14:30:00.250Z").map(|d| d.date()), Some(at(2025, 5, 6, 0, 0).date()));
        assert_eq!(parse("2025-05-06 14:30"), Some(at(2025, 5, 6, 14, 30)));
        assert_eq!(parse("06.05.2025 14:30"), Some(at(2025, 5, 6, 14, 30)));
        assert_eq!(parse("May 6, 2025"), Some(at(2025, 5, 6, 0, 0)));
        assert_eq!(parse("next tuesday"), None);
    }
}
