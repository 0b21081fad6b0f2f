//! Clock times (time of day, not calendar timestamps)
//!
//! A [`ClockTime`] is a duration since midnight in `[0, 24h)`, stored in whole
//! seconds. Survey answers arrive as free text (`22:30`, `10:30 PM`, `7:05:00`);
//! anything without an `H:MM` group is rejected before any arithmetic happens.
//!
//! No 12-hour disambiguation happens here. That needs both ends of an interval
//! and lives in [`crate::interval`].

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

pub const SECONDS_PER_DAY: i64 = 86_400;
pub const SECONDS_PER_HOUR: i64 = 3_600;

/// Minimal lexical precondition: some digit, a colon, two digits
static CLOCK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d:\d\d").expect("static clock pattern compiles"));

static CLOCK_FULL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([AaPp])?\.?\s*(?:[Mm]\.?)?$")
        .expect("static clock grammar compiles")
});

/// Point in the 24-hour cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    seconds: u32,
}

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime { seconds: 0 };

    /// Build from hours/minutes/seconds; out-of-range parts are a format error
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Result<Self> {
        if hours >= 24 || minutes >= 60 || seconds >= 60 {
            return Err(Error::format(format!(
                "clock time {:02}:{:02}:{:02} is outside 00:00-23:59",
                hours, minutes, seconds
            )));
        }
        Ok(Self {
            seconds: hours * 3600 + minutes * 60 + seconds,
        })
    }

    /// Build from a seconds-since-midnight value, wrapping around the cycle
    pub fn wrapping_from_seconds(seconds: i64) -> Self {
        Self {
            seconds: seconds.rem_euclid(SECONDS_PER_DAY) as u32,
        }
    }

    /// Build from a seconds-since-midnight value that must already be in `[0, 24h)`
    pub fn from_seconds(seconds: i64) -> Result<Self> {
        if !(0..SECONDS_PER_DAY).contains(&seconds) {
            return Err(Error::invariant(format!(
                "{} seconds is not a valid clock time",
                seconds
            )));
        }
        Ok(Self {
            seconds: seconds as u32,
        })
    }

    /// Build from an elapsed duration that must already be in `[0, 24h)`
    pub fn from_duration(duration: chrono::Duration) -> Result<Self> {
        Self::from_seconds(duration.num_seconds())
    }

    /// Parse a free-text time of day
    ///
    /// **Accepted forms:** `H:MM`, `HH:MM`, `HH:MM:SS`, each optionally followed by
    /// `AM`/`PM` (any case, optional periods).
    pub fn parse(raw: &str) -> Result<Self> {
        let text = raw.trim();
        if !CLOCK_PATTERN.is_match(text) {
            return Err(Error::format(format!("'{}' is not a clock time (expected H:MM)", raw)));
        }

        let caps = CLOCK_FULL
            .captures(text)
            .ok_or_else(|| Error::format(format!("'{}' is not a recognizable clock time", raw)))?;

        let mut hours: u32 = caps[1]
            .parse()
            .map_err(|_| Error::format(format!("bad hour in '{}'", raw)))?;
        let minutes: u32 = caps[2]
            .parse()
            .map_err(|_| Error::format(format!("bad minute in '{}'", raw)))?;
        let seconds: u32 = match caps.get(3) {
            Some(s) => s
                .as_str()
                .parse()
                .map_err(|_| Error::format(format!("bad second in '{}'", raw)))?,
            None => 0,
        };

        if let Some(meridiem) = caps.get(4) {
            if hours == 0 || hours > 12 {
                return Err(Error::format(format!("'{}' mixes 24-hour and AM/PM notation", raw)));
            }
            let pm = meridiem.as_str().eq_ignore_ascii_case("p");
            hours = match (pm, hours) {
                (false, 12) => 0,
                (false, h) => h,
                (true, 12) => 12,
                (true, h) => h + 12,
            };
        }

        Self::from_hms(hours, minutes, seconds)
    }

    pub fn seconds(&self) -> i64 {
        self.seconds as i64
    }

    pub fn hours(&self) -> f64 {
        self.seconds as f64 / SECONDS_PER_HOUR as f64
    }

    /// Round to the nearest minute (ties to even), wrapping 24:00 to 00:00
    pub fn round_to_minute(&self) -> Self {
        let minutes = (self.seconds as f64 / 60.0).round_ties_even() as i64;
        Self::wrapping_from_seconds(minutes * 60)
    }
}

impl fmt::Display for ClockTime {
    /// Zero-padded `HH:MM`, rounded to the minute
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.round_to_minute();
        let minutes = rounded.seconds / 60;
        write!(f, "{:02}:{:02}", minutes / 60, minutes % 60)
    }
}
