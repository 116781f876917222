//! Timestamp coercion for datetime-named columns.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::input::Scalar;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Parse a cell as a UTC timestamp. Unparseable cells yield `None`.
///
/// Naive values are taken as UTC; bare numbers as Unix epoch seconds.
pub fn parse_timestamp(value: &Scalar) -> Option<DateTime<Utc>> {
    match value {
        Scalar::Number(n) if n.is_finite() => from_epoch(*n),
        Scalar::Text(s) => parse_text(s.trim()),
        _ => None,
    }
}

fn parse_text(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    s.parse::<f64>().ok().and_then(from_epoch)
}

fn from_epoch(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_formats() {
        let cases = [
            "2024-03-01T10:30:00Z",
            "2024-03-01T10:30:00+00:00",
            "2024-03-01 10:30:00",
            "2024-03-01 10:30:00.250",
            "2024-03-01T10:30",
            "03/01/2024 10:30:00",
        ];
        for case in cases {
            let dt = parse_timestamp(&Scalar::from(case)).unwrap_or_else(|| panic!("{case}"));
            assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 3, 1), "{case}");
            assert_eq!((dt.hour(), dt.minute()), (10, 30), "{case}");
        }
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_timestamp(&Scalar::from("2024-03-01")).unwrap();
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_epoch_seconds() {
        let dt = parse_timestamp(&Scalar::Number(86_400.0)).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (1970, 1, 2));
        assert!(parse_timestamp(&Scalar::from("86400")).is_some());
    }

    #[test]
    fn test_unparseable_is_none() {
        assert!(parse_timestamp(&Scalar::from("yesterday-ish")).is_none());
        assert!(parse_timestamp(&Scalar::Null).is_none());
        assert!(parse_timestamp(&Scalar::Bool(true)).is_none());
    }
}
