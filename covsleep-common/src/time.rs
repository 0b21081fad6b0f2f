//! Timestamp utilities for survey exports
//!
//! The survey platform writes `YYYY-MM-DD HH:MM[:SS]` timestamps and plain
//! `YYYY-MM-DD` dates; the retrospective vaccine survey uses `M/D/YYYY H:MM`.
//! An unfinished instrument carries the literal `[not completed]`.

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Marker the survey platform writes for an unfinished instrument
pub const NOT_COMPLETED: &str = "[not completed]";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%Y/%m/%d"];

/// Parse a timestamp cell; `[not completed]` and blank text are missing
pub fn parse_timestamp(raw: &str) -> Result<Option<NaiveDateTime>> {
    let text = raw.trim();
    if text.is_empty() || text == NOT_COMPLETED {
        return Ok(None);
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Some(ts));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Ok(Some(date.and_time(NaiveTime::MIN)));
        }
    }
    Err(Error::format(format!("'{}' is not a recognizable date or timestamp", raw)))
}

/// Calendar date helper (`YYYY-MM-DD`)
pub fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::InvalidInput(format!("{}-{}-{} is not a date", year, month, day)))
}

/// Midnight at the start of the timestamp's day
pub fn normalize(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date().and_time(NaiveTime::MIN)
}

/// True when the time of day is exactly midnight
pub fn is_midnight(ts: &NaiveDateTime) -> bool {
    ts.num_seconds_from_midnight() == 0 && ts.nanosecond() == 0
}

/// True for times of day in `[00:00, 04:00]`
pub fn is_early_morning(ts: &NaiveDateTime) -> bool {
    ts.num_seconds_from_midnight() <= 4 * 3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_survey_timestamp() {
        let ts = parse_timestamp("2020-04-12 21:05:33").unwrap().unwrap();
        assert_eq!(ts.date(), date(2020, 4, 12).unwrap());
        assert_eq!(ts.hour(), 21);
    }

    #[test]
    fn test_parse_date_only() {
        let ts = parse_timestamp("2021-04-18").unwrap().unwrap();
        assert!(is_midnight(&ts));
    }

    #[test]
    fn test_parse_us_style() {
        let ts = parse_timestamp("1/6/2022 9:09").unwrap().unwrap();
        assert_eq!(ts.date(), date(2022, 1, 6).unwrap());
        assert_eq!(ts.minute(), 9);
    }

    #[test]
    fn test_not_completed_is_missing() {
        assert_eq!(parse_timestamp(NOT_COMPLETED).unwrap(), None);
        assert_eq!(parse_timestamp("  ").unwrap(), None);
    }

    #[test]
    fn test_garbage_is_format_error() {
        assert!(matches!(parse_timestamp("yesterday").unwrap_err(), Error::Format(_)));
    }

    #[test]
    fn test_early_morning_boundaries() {
        let at_four = parse_timestamp("2020-04-12 04:00").unwrap().unwrap();
        let after_four = parse_timestamp("2020-04-12 04:01").unwrap().unwrap();
        assert!(is_early_morning(&at_four));
        assert!(!is_early_morning(&after_four));
    }

    #[test]
    fn test_normalize_drops_time() {
        let ts = parse_timestamp("2020-04-12 21:05").unwrap().unwrap();
        assert!(is_midnight(&normalize(ts)));
    }
}
