//! Date helpers
//!
//! Timestamps are kept in UTC and only converted to the configured timezone
//! for display.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Display format used when none is configured
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Current time in UTC
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a date string
///
/// Tries RFC 3339, then `YYYY-MM-DD HH:MM:SS +ZZZZ`, then a few common
/// formats without an offset (taken as UTC), then a bare date at midnight UTC.
pub fn parse_date(input: &str) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt);
    }

    let utc = FixedOffset::east_opt(0)?;
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(utc.from_utc_datetime(&naive));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Look up an IANA timezone such as `Europe/Paris`
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.parse().ok()
}

/// Whether `format` is a usable strftime pattern
pub fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Format a timestamp in `tz` with [`DEFAULT_DATE_FORMAT`]
pub fn format_date<T: TimeZone>(dt: &DateTime<T>, tz: Tz) -> String {
    format_date_with(dt, tz, DEFAULT_DATE_FORMAT)
}

/// Format a timestamp in `tz` with a strftime pattern
///
/// An invalid pattern falls back to [`DEFAULT_DATE_FORMAT`].
pub fn format_date_with<T: TimeZone>(dt: &DateTime<T>, tz: Tz, format: &str) -> String {
    let format = if is_valid_format(format) {
        format
    } else {
        warn!("Invalid date format '{}', using the default", format);
        DEFAULT_DATE_FORMAT
    };
    dt.with_timezone(&tz).format(format).to_string()
}

/// Format a timestamp in the timezone named `tz`, falling back to UTC
pub fn format_date_str<T: TimeZone>(dt: &DateTime<T>, tz: &str) -> String {
    let zone = parse_timezone(tz).unwrap_or_else(|| {
        warn!("Unknown timezone '{}', using UTC", tz);
        Tz::UTC
    });
    format_date(dt, zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_date("2024-03-01T12:30:00+02:00").unwrap();
        assert_eq!(dt.hour(), 12);
        assert_eq!(dt.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let dt = parse_date("2024-03-01 08:15:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!(dt.minute(), 15);

        let date = parse_date("01/03/2024").unwrap();
        assert_eq!(date.month(), 3);
        assert_eq!(date.hour(), 0);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_date("yesterday-ish").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_format_in_timezone() {
        let dt = parse_date("2024-01-15T12:00:00Z").unwrap();
        assert_eq!(
            format_date(&dt, chrono_tz::Europe::Paris),
            "2024-01-15 13:00:00 CET"
        );
        assert_eq!(format_date_str(&dt, "UTC"), "2024-01-15 12:00:00 UTC");
        assert_eq!(format_date_str(&dt, "Not/AZone"), "2024-01-15 12:00:00 UTC");
    }

    #[test]
    fn test_custom_format() {
        let dt = parse_date("2024-01-15T12:00:00Z").unwrap();
        assert_eq!(
            format_date_with(&dt, chrono_tz::Europe::Paris, "%d/%m/%Y %H:%M"),
            "15/01/2024 13:00"
        );
        assert!(!is_valid_format("%Y-%"));
        assert_eq!(
            format_date_with(&dt, Tz::UTC, "%Y-%"),
            "2024-01-15 12:00:00 UTC"
        );
    }

    #[test]
    fn test_timezone_lookup() {
        assert!(parse_timezone("America/New_York").is_some());
        assert!(parse_timezone("Mars/Olympus").is_none());
    }
}
