//! Shared parsing utilities for the dataset loaders.
//!
//! The municipal exports mix several date layouts within a single column,
//! store zip codes as floats, and use `0` as a coordinate placeholder. The
//! helpers here normalize all of that.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Outcome of parsing a latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateParse {
    /// Both values present, numeric, in range, and non-zero.
    Valid(f64, f64),
    /// At least one cell was empty.
    Missing,
    /// Unparseable, out of range, or a zero placeholder.
    Invalid,
}

/// Parses lat/lng cells. Empty cells are `Missing`; non-numeric or
/// out-of-range values and the `(0, 0)` placeholder are `Invalid`.
#[must_use]
pub fn parse_coordinates(lat: Option<&str>, lng: Option<&str>) -> CoordinateParse {
    let (Some(lat_str), Some(lng_str)) = (lat, lng) else {
        return CoordinateParse::Missing;
    };
    let (Ok(latitude), Ok(longitude)) = (lat_str.parse::<f64>(), lng_str.parse::<f64>()) else {
        return CoordinateParse::Invalid;
    };
    if (latitude == 0.0 && longitude == 0.0)
        || !(-90.0..=90.0).contains(&latitude)
        || !(-180.0..=180.0).contains(&longitude)
    {
        return CoordinateParse::Invalid;
    }
    CoordinateParse::Valid(latitude, longitude)
}

/// Datetime layouts with an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y/%m/%d %H:%M:%S%.f%#z",
];

/// Datetime layouts without an offset (interpreted as UTC).
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y"];

/// Parses a date cell written in any of the layouts the sources use,
/// converting offset timestamps to UTC before taking the calendar date.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // `Z` suffix is handled by RFC 3339 directly.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc).date_naive());
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    // Trailing junk after an ISO date (e.g. "2024-01-15 00:00:00+00:00:00").
    s.get(..10).and_then(|prefix| {
        DATE_FORMATS
            .iter()
            .take(2)
            .find_map(|format| NaiveDate::parse_from_str(prefix, format).ok())
    })
}

/// Parses an `HHMM` start-time cell (possibly unpadded or float-formatted,
/// e.g. `"930"` or `"1430.0"`) into an hour of day.
#[must_use]
pub fn parse_hhmm_hour(s: &str) -> Option<u32> {
    let digits = strip_float_suffix(s.trim());
    if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{digits:0>4}");
    let hour = padded[..2].parse::<u32>().ok()?;
    (hour < 24).then_some(hour)
}

/// Interprets a boolean-ish cell (`True`, `t`, `yes`, `Y`, `1`).
#[must_use]
pub fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1" | "1.0"
    )
}

/// Normalizes a zip cell: trims, strips float artifacts (`13205.0`) and
/// ZIP+4 suffixes, and maps blanks and null spellings to `None`.
#[must_use]
pub fn normalize_zip(s: &str) -> Option<String> {
    let trimmed = strip_float_suffix(s.trim());
    let base = trimmed.split('-').next().unwrap_or(trimmed).trim();
    if base.is_empty() || matches!(base.to_ascii_lowercase().as_str(), "nan" | "none" | "null") {
        return None;
    }
    Some(base.to_owned())
}

fn strip_float_suffix(s: &str) -> &str {
    s.strip_suffix(".0").unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_mixed_date_layouts() {
        assert_eq!(parse_date("2024-01-15T14:30:00.000Z"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024-01-15T14:30:00"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024/01/15 05:00:00+00"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("01/15/2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024-01-15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("1/5/2024 10:00:00 PM"), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn offset_dates_convert_to_utc() {
        assert_eq!(
            parse_date("2024-01-15T22:30:00-05:00"),
            Some(ymd(2024, 1, 16))
        );
    }

    #[test]
    fn rejects_invalid_date() {
        assert!(parse_date("not-a-date").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn coordinates() {
        assert_eq!(
            parse_coordinates(Some("43.05"), Some("-76.15")),
            CoordinateParse::Valid(43.05, -76.15)
        );
        assert_eq!(
            parse_coordinates(None, Some("-76.15")),
            CoordinateParse::Missing
        );
        assert_eq!(
            parse_coordinates(Some("abc"), Some("-76.15")),
            CoordinateParse::Invalid
        );
        assert_eq!(
            parse_coordinates(Some("0"), Some("0.0")),
            CoordinateParse::Invalid
        );
        assert_eq!(
            parse_coordinates(Some("95.0"), Some("-76.15")),
            CoordinateParse::Invalid
        );
    }

    #[test]
    fn equator_and_prime_meridian_are_valid() {
        assert_eq!(
            parse_coordinates(Some("0"), Some("32.58")),
            CoordinateParse::Valid(0.0, 32.58)
        );
        assert_eq!(
            parse_coordinates(Some("51.48"), Some("0")),
            CoordinateParse::Valid(51.48, 0.0)
        );
        assert_eq!(
            parse_coordinates(Some("NaN"), Some("32.58")),
            CoordinateParse::Invalid
        );
    }

    #[test]
    fn hhmm_hours() {
        assert_eq!(parse_hhmm_hour("0930"), Some(9));
        assert_eq!(parse_hhmm_hour("930"), Some(9));
        assert_eq!(parse_hhmm_hour("5"), Some(0));
        assert_eq!(parse_hhmm_hour("2359"), Some(23));
        assert_eq!(parse_hhmm_hour("1430.0"), Some(14));
        assert_eq!(parse_hhmm_hour("2500"), None);
        assert_eq!(parse_hhmm_hour("abc"), None);
    }

    #[test]
    fn flags() {
        assert!(parse_flag("True"));
        assert!(parse_flag(" y "));
        assert!(!parse_flag("False"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn zips() {
        assert_eq!(normalize_zip(" 13205 "), Some("13205".to_owned()));
        assert_eq!(normalize_zip("13205.0"), Some("13205".to_owned()));
        assert_eq!(normalize_zip("13205-1234"), Some("13205".to_owned()));
        assert_eq!(normalize_zip("nan"), None);
        assert_eq!(normalize_zip(""), None);
    }
}
