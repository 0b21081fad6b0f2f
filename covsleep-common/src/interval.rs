//! Sleep-interval arithmetic
//!
//! Respondents enter bed and wake times without AM/PM, so an interval such as
//! `11:00 -> 10:50` usually means eleven hours fifty minutes, not twenty-three.
//!
//! **Algorithm ([`compute_interval`]):**
//! 1. Naive duration = offset - onset on a 24-hour cycle (add 24h when negative)
//! 2. When correction is enabled and both ends lie in the ambiguity window
//!    `[01:00, 13:00)` with offset before onset, subtract 12h and set the flag
//! 3. Duration must lie in `[0, 24]`, otherwise the run aborts
//! 4. When the duration is shorter than the ambiguity floor and both ends lie in
//!    the window, the duration cannot be told apart from duration + 12h and is
//!    reported as missing
//!
//! Window boundaries are part of the published scoring policy and are kept exact.

use crate::clock::{ClockTime, SECONDS_PER_DAY, SECONDS_PER_HOUR};
use crate::{Error, Result};

/// Lower bound of the 12-hour ambiguity window (inclusive)
pub const AMBIGUITY_WINDOW_START: i64 = SECONDS_PER_HOUR;
/// Upper bound of the 12-hour ambiguity window (exclusive)
pub const AMBIGUITY_WINDOW_END: i64 = 13 * SECONDS_PER_HOUR;

/// How an interval is disambiguated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalPolicy {
    pub correct_12h: bool,
    /// Durations below this many hours inside the window become missing; 0 disables
    pub ambiguity_floor_hours: f64,
}

impl IntervalPolicy {
    /// Plain 24-hour arithmetic
    pub const PLAIN: IntervalPolicy = IntervalPolicy {
        correct_12h: false,
        ambiguity_floor_hours: 0.0,
    };

    /// Bed time to out-of-bed time
    pub const TIME_IN_BED: IntervalPolicy = IntervalPolicy {
        correct_12h: true,
        ambiguity_floor_hours: 3.0,
    };

    /// Sleep onset to final awakening (daily sleep attempt, MCTQ)
    pub const SLEEP_PERIOD: IntervalPolicy = IntervalPolicy {
        correct_12h: true,
        ambiguity_floor_hours: 2.0,
    };
}

/// Result of interval arithmetic on one (onset, offset) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepInterval {
    /// Duration in hours, missing when unknowable or when an endpoint is missing
    pub duration_hours: Option<f64>,
    pub corrected_12h: bool,
}

impl SleepInterval {
    pub const MISSING: SleepInterval = SleepInterval {
        duration_hours: None,
        corrected_12h: false,
    };

    /// 0/1 flag as written to the `_12` columns
    pub fn correction_flag(&self) -> f64 {
        if self.corrected_12h {
            1.0
        } else {
            0.0
        }
    }
}

fn in_ambiguity_window(t: ClockTime) -> bool {
    (AMBIGUITY_WINDOW_START..AMBIGUITY_WINDOW_END).contains(&t.seconds())
}

/// Duration in seconds (missing when unknowable) and the correction flag
fn interval_seconds(
    onset: ClockTime,
    offset: ClockTime,
    policy: IntervalPolicy,
) -> Result<(Option<i64>, bool)> {
    let mut seconds = offset.seconds() - onset.seconds();
    if seconds < 0 {
        seconds += SECONDS_PER_DAY;
    }

    let both_in_window = in_ambiguity_window(onset) && in_ambiguity_window(offset);

    let mut corrected = false;
    if policy.correct_12h && both_in_window && offset < onset {
        seconds -= 12 * SECONDS_PER_HOUR;
        corrected = true;
    }

    if !(0..=SECONDS_PER_DAY).contains(&seconds) {
        return Err(Error::invariant(format!(
            "interval {} -> {} produced duration {:.3}h outside [0, 24]",
            onset,
            offset,
            seconds as f64 / SECONDS_PER_HOUR as f64
        )));
    }

    let floor_seconds = policy.ambiguity_floor_hours * SECONDS_PER_HOUR as f64;
    if policy.ambiguity_floor_hours > 0.0 && (seconds as f64) < floor_seconds && both_in_window {
        return Ok((None, corrected));
    }

    Ok((Some(seconds), corrected))
}

/// Round a count of half-seconds to whole minutes, ties to even
fn half_seconds_to_minutes(half_seconds: i64) -> i64 {
    let q = half_seconds.div_euclid(120);
    let r = half_seconds.rem_euclid(120);
    match r.cmp(&60) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => q + (q & 1),
    }
}

/// Duration and 12-hour correction flag for one interval
pub fn compute_interval(
    onset: ClockTime,
    offset: ClockTime,
    policy: IntervalPolicy,
) -> Result<SleepInterval> {
    let (seconds, corrected) = interval_seconds(onset, offset, policy)?;
    Ok(SleepInterval {
        duration_hours: seconds.map(|s| s as f64 / SECONDS_PER_HOUR as f64),
        corrected_12h: corrected,
    })
}

/// Interval for possibly-missing endpoints; any missing endpoint gives a missing duration
pub fn interval_between(
    onset: Option<ClockTime>,
    offset: Option<ClockTime>,
    policy: IntervalPolicy,
) -> Result<SleepInterval> {
    match (onset, offset) {
        (Some(on), Some(off)) => compute_interval(on, off, policy),
        _ => Ok(SleepInterval::MISSING),
    }
}

/// Midpoint of an interval, rounded to the minute
///
/// When the 12-hour correction fired, a midpoint landing at or past 13:00 is
/// pulled back by 12h; otherwise a midpoint past midnight wraps by 24h.
pub fn compute_midpoint(
    onset: ClockTime,
    offset: ClockTime,
    policy: IntervalPolicy,
) -> Result<Option<ClockTime>> {
    let (seconds, corrected) = interval_seconds(onset, offset, policy)?;
    let duration = match seconds {
        Some(s) => s,
        None => return Ok(None),
    };

    // Work in half-seconds so odd durations halve exactly
    let mut midpoint = 2 * onset.seconds() + duration;
    if !corrected && midpoint >= 2 * SECONDS_PER_DAY {
        midpoint -= 2 * SECONDS_PER_DAY;
    }
    if corrected && midpoint >= 2 * 13 * SECONDS_PER_HOUR {
        midpoint -= 2 * 12 * SECONDS_PER_HOUR;
    }

    let seconds = half_seconds_to_minutes(midpoint) * 60;
    if !(0..=SECONDS_PER_DAY).contains(&seconds) {
        return Err(Error::invariant(format!(
            "midpoint of {} -> {} fell outside the 24-hour cycle",
            onset, offset
        )));
    }
    Ok(Some(ClockTime::wrapping_from_seconds(seconds)))
}

/// Midpoint for possibly-missing endpoints
pub fn midpoint_between(
    onset: Option<ClockTime>,
    offset: Option<ClockTime>,
    policy: IntervalPolicy,
) -> Result<Option<ClockTime>> {
    match (onset, offset) {
        (Some(on), Some(off)) => compute_midpoint(on, off, policy),
        _ => Ok(None),
    }
}

/// Sleep-corrected mid-sleep on free days (MCTQ chronotype)
///
/// Free-day midpoint, moved earlier by half of any free-day oversleep relative
/// to work days. Negative results are missing rather than wrapped.
pub fn chronotype(
    free_midpoint: Option<ClockTime>,
    work_duration_hours: Option<f64>,
    free_duration_hours: Option<f64>,
) -> Option<ClockTime> {
    let midpoint = free_midpoint?;
    let mut half_seconds = 2 * midpoint.seconds();
    if let (Some(work), Some(free)) = (work_duration_hours, free_duration_hours) {
        if free > work {
            // (free - work) / 2 hours, expressed in half-seconds
            half_seconds -= ((free - work) * SECONDS_PER_HOUR as f64).round() as i64;
        }
    }
    let minutes = half_seconds_to_minutes(half_seconds);
    if minutes < 0 {
        return None;
    }
    Some(ClockTime::wrapping_from_seconds(minutes * 60))
}

/// Average weekly sleep duration from work-day and free-day durations
pub fn average_weekly_duration(
    work_duration_hours: Option<f64>,
    free_duration_hours: Option<f64>,
    workdays: Option<f64>,
) -> Option<f64> {
    let work = work_duration_hours?;
    let free = free_duration_hours?;
    let days = workdays?;
    Some((work * days + free * (7.0 - days)) / 7.0)
}
