//! `updated_at` stamps: formatting, parsing and ordering.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::cmp::Ordering;

/// Format a stamp the way browsers do (`2024-05-01T09:30:00.000Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 stamp. Stamps without an offset are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Order two optional stamps. A missing or unparseable stamp is older than any valid one.
pub fn compare_timestamps(a: Option<&str>, b: Option<&str>) -> Ordering {
    let a = a.and_then(parse_timestamp);
    let b = b.and_then(parse_timestamp);
    a.cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_uses_millis_and_z() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(format_timestamp(at), "2024-05-01T09:30:00.000Z");
    }

    #[test]
    fn test_parse_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T09:30:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T11:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T09:30:00"), Some(expected));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_missing_stamp_is_older() {
        let stamp = Some("2024-05-01T09:30:00.000Z");
        assert_eq!(compare_timestamps(None, stamp), Ordering::Less);
        assert_eq!(compare_timestamps(Some("garbage"), stamp), Ordering::Less);
        assert_eq!(compare_timestamps(None, None), Ordering::Equal);
        assert_eq!(
            compare_timestamps(Some("2024-05-01T09:30:00.001Z"), stamp),
            Ordering::Greater
        );
    }
}
