//! Daily diary formatting
//!
//! Runs after identity reconciliation on the combined daily table: drops
//! unfinished submissions, derives the authoritative submission time, parses
//! diary clocks, applies plausibility rules, infers the reference date each
//! diary describes and derives the sleep variables.

use crate::normalize::range::{
    blank_above, blank_not_completed, coerce_numeric_lenient, parse_clocks, parse_timestamps,
    shift,
};
use crate::normalize::vocab::FEVER_TEMPERATURES;
use crate::report::RunReport;
use crate::sources::{APRIL18_COMPLETE, NOV15_COMPLETE, SUB_ID, UNIQUE_ID};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use covsleep_common::clock::SECONDS_PER_DAY;
use covsleep_common::interval::interval_between;
use covsleep_common::time::{date, is_early_morning, normalize, NOT_COMPLETED};
use covsleep_common::{Error, IntervalPolicy, Result, Table, Value};
use std::collections::HashMap;
use tracing::{debug, info};

const TABLE: &str = "daily";

pub const LONG_TIMESTAMP: &str = "covid19_timestamp";
pub const SHORT_TIMESTAMP: &str = "covid19_short_survey_timestamp";
pub const APRIL18_TIMESTAMP: &str = "april_18_timestamp";
pub const NOV15_TIMESTAMP: &str = "nov15_timestamp";
pub const REDCAP_TIMESTAMP: &str = "redcap_timestamp";
pub const TODAYS_DATE: &str = "todays_date";
pub const REF_DATE: &str = "ref_date";
pub const DAYS_ELAPSED: &str = "days_elapsed";

pub const BEDTIME: &str = "sleepdiary_bedtime";
pub const FALL_ASLEEP: &str = "sleepdiary_fallasleep";
pub const WAKE_TIME: &str = "sleepdiary_waketime";
pub const OUT_OF_BED: &str = "sleepdiary_outofbed";
pub const LATENCY: &str = "sleepdiary_sleeplatency";
pub const AWAKENING: &str = "night_awakening_time";

/// Diary clock columns
pub const TIME_COLUMNS: [&str; 4] = [BEDTIME, FALL_ASLEEP, WAKE_TIME, OUT_OF_BED];

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;
const MAX_DRINKS: f64 = 48.0;

/// Side tables written to the check directory
#[derive(Debug, Clone)]
pub struct DailyAudits {
    /// Rows whose reference date could not be inferred
    pub ref_date_problems: Table,
    /// Inputs and outputs of the sleep-variable derivation
    pub sleep_variables: Table,
}

/// Format the reconciled daily table in place
pub fn format_daily(table: &mut Table, report: &mut RunReport) -> Result<DailyAudits> {
    drop_not_completed(table, report)?;
    derive_submission_time(table)?;
    for column in [LONG_TIMESTAMP, SHORT_TIMESTAMP, TODAYS_DATE] {
        blank_not_completed(table, column)?;
        parse_timestamps(table, column)?;
    }
    for column in TIME_COLUMNS {
        parse_clocks(table, column)?;
    }

    let rejected = coerce_numeric_lenient(table, "fever_temp", FEVER_TEMPERATURES)?;
    report.record_audit(TABLE, "fever_temp", rejected);
    for i in 1..=8 {
        shift(table, &format!("depression{}", i), -1.0)?;
    }

    zero_when_none(table, "sleepdiary_wakes", AWAKENING)?;
    zero_when_none(table, "sleepdiary_nap", "sleepdiary_naptime")?;
    zero_when_none(table, "socialize", "socialize_min")?;

    for column in [LATENCY, "sleepdiary_naptime", AWAKENING, "socialize_min"] {
        let blanked = blank_above(table, column, MINUTES_PER_DAY)?;
        report.record_plausibility(TABLE, column, blanked);
    }
    let blanked = blank_above(table, "alcohol_bev", MAX_DRINKS)?;
    report.record_plausibility(TABLE, "alcohol_bev", blanked);
    let blanked = blank_impossible_quarantine(table)?;
    report.record_plausibility(TABLE, "quarantine_days", blanked);

    let ref_date_problems = assign_reference_dates(table)?;
    report.record_reference_date_problems(ref_date_problems.len());

    let sleep_variables = derive_sleep_variables(table)?;
    derive_exercise(table)?;
    let blanked = derive_celsius(table)?;
    report.record_plausibility(TABLE, "fever_temp_C", blanked);

    info!(
        rows = table.len(),
        ref_date_problems = ref_date_problems.len(),
        "Formatted daily surveys"
    );
    Ok(DailyAudits {
        ref_date_problems,
        sleep_variables,
    })
}

/// Remove submissions whose instrument was opened but never finished
pub fn drop_not_completed(table: &mut Table, report: &mut RunReport) -> Result<usize> {
    let unfinished = |v: &Value| v.as_text().is_some_and(|s| s.trim() == NOT_COMPLETED);
    let long = table.column_values(LONG_TIMESTAMP)?;
    let short = table.column_values(SHORT_TIMESTAMP)?;
    let keep: Vec<bool> = long
        .iter()
        .zip(&short)
        .map(|(l, s)| !unfinished(l) && !unfinished(s))
        .collect();
    let dropped = table.retain_rows(&keep)?;
    report.record_drop(TABLE, "not_completed", dropped);
    Ok(dropped)
}

/// Build `redcap_timestamp` from the instrument and wave timestamps
///
/// Long timestamp, else short; rows from a one-off wave take that wave's
/// timestamp. Every row must end up with one.
pub fn derive_submission_time(table: &mut Table) -> Result<()> {
    let long = table.column_values(LONG_TIMESTAMP)?;
    let short = table.column_values(SHORT_TIMESTAMP)?;
    let mut values: Vec<Value> = long
        .into_iter()
        .zip(short)
        .map(|(l, s)| if l.is_missing() { s } else { l })
        .collect();

    for (timestamp, complete) in [
        (APRIL18_TIMESTAMP, APRIL18_COMPLETE),
        (NOV15_TIMESTAMP, NOV15_COMPLETE),
    ] {
        let stamps = table.column_values(timestamp)?;
        let completes = table.column_values(complete)?;
        for (row, value) in values.iter_mut().enumerate() {
            if !completes[row].is_missing() {
                *value = stamps[row].clone();
            }
        }
    }

    let mut parsed = Vec::with_capacity(values.len());
    for (row, value) in values.iter().enumerate() {
        match value.as_timestamp()? {
            Some(ts) => parsed.push(Value::Timestamp(ts)),
            None => {
                return Err(Error::invariant(format!(
                    "{} row {} (record {}): no submission timestamp",
                    TABLE,
                    row,
                    table.get(row, UNIQUE_ID)?.key_text()
                )))
            }
        }
    }
    table.set_column(REDCAP_TIMESTAMP, parsed)
}

/// Set `target` to 0 where the gate question was answered 0
fn zero_when_none(table: &mut Table, gate: &str, target: &str) -> Result<()> {
    let gates = table.numbers(gate)?;
    let mut values = table.column_values(target)?;
    for (value, gate) in values.iter_mut().zip(gates) {
        if gate == Some(0.0) {
            *value = Value::Number(0.0);
        }
    }
    table.set_column(target, values)
}

/// Quarantine longer than the time since the first lockdown is implausible
fn blank_impossible_quarantine(table: &mut Table) -> Result<usize> {
    let start = date(2020, 1, 23)?.and_time(NaiveTime::MIN);
    let mut blanked = 0;
    let mut values = table.column_values("quarantine_days")?;
    for (row, value) in values.iter_mut().enumerate() {
        let Some(days) = value.as_number()? else {
            *value = Value::Missing;
            continue;
        };
        *value = Value::Number(days);
        if let Some(submitted) = table.timestamp(row, REDCAP_TIMESTAMP)? {
            if ((submitted - start).num_days() as f64) < days {
                *value = Value::Missing;
                blanked += 1;
            }
        }
    }
    table.set_column("quarantine_days", values)?;
    Ok(blanked)
}

fn day_key(sub_id: &Value, ts: Option<NaiveDateTime>) -> Option<(String, NaiveDateTime)> {
    ts.map(|t| (sub_id.key_text(), normalize(t)))
}

/// Flag unusable rows and give every other row its reference date
///
/// A row is flagged when its subject submitted more than once for the same
/// `todays_date`, or when `todays_date` is more than a day away from the
/// submission time. Flagged rows keep a missing reference date and are
/// returned as the audit table.
pub fn assign_reference_dates(table: &mut Table) -> Result<Table> {
    let sub_ids = table.column_values(SUB_ID)?;
    let mut today = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        today.push(table.timestamp(row, TODAYS_DATE)?);
    }

    let mut per_day: HashMap<(String, NaiveDateTime), usize> = HashMap::new();
    for (id, ts) in sub_ids.iter().zip(&today) {
        if let Some(key) = day_key(id, *ts) {
            *per_day.entry(key).or_default() += 1;
        }
    }

    let mut flagged = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let duplicate = day_key(&sub_ids[row], today[row])
            .and_then(|key| per_day.get(&key))
            .is_some_and(|&n| n > 1);
        let far = match (today[row], table.timestamp(row, REDCAP_TIMESTAMP)?) {
            (Some(t), Some(r)) => (t - r).num_seconds().abs() > SECONDS_PER_DAY,
            _ => false,
        };
        flagged.push(duplicate || far);
    }

    let ref_dates: Vec<Option<NaiveDateTime>> = today
        .iter()
        .zip(&flagged)
        .map(|(ts, &flag)| match ts {
            Some(t) if !flag => {
                let mut r = *t - Duration::days(1);
                if is_early_morning(t) {
                    r -= Duration::days(1);
                }
                Some(normalize(r))
            }
            _ => None,
        })
        .collect();
    let first = ref_dates.iter().flatten().min().copied();
    let elapsed: Vec<Value> = ref_dates
        .iter()
        .map(|r| match (r, first) {
            (Some(r), Some(first)) => Value::Number((*r - first).num_days() as f64),
            _ => Value::Missing,
        })
        .collect();
    table.set_column(REF_DATE, ref_dates.iter().map(|r| Value::from_option(*r)).collect())?;
    table.set_column(DAYS_ELAPSED, elapsed)?;

    let columns: Vec<String> = [
        UNIQUE_ID,
        SUB_ID,
        TODAYS_DATE,
        REDCAP_TIMESTAMP,
        LONG_TIMESTAMP,
        SHORT_TIMESTAMP,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    let mut problems = table.select_columns("ref_date_problems", &columns)?;
    problems.retain_rows(&flagged)?;
    if !problems.is_empty() {
        info!(rows = problems.len(), "Daily rows without a reference date");
    }
    Ok(problems)
}

fn blank_rows(table: &mut Table, columns: &[&str], rows: &[bool]) -> Result<()> {
    for column in columns {
        let mut values = table.column_values(column)?;
        for (value, &blank) in values.iter_mut().zip(rows) {
            if blank {
                *value = Value::Missing;
            }
        }
        table.set_column(column, values)?;
    }
    Ok(())
}

/// Time in bed, sleep attempt, total sleep time and efficiency
pub fn derive_sleep_variables(table: &mut Table) -> Result<Table> {
    let rows = table.len();
    let mut tib = Vec::with_capacity(rows);
    let mut tib_flag = Vec::with_capacity(rows);
    let mut attempt = Vec::with_capacity(rows);
    let mut attempt_flag = Vec::with_capacity(rows);
    let mut tst = Vec::with_capacity(rows);
    let mut efficiency = Vec::with_capacity(rows);
    let mut implausible = Vec::with_capacity(rows);

    for row in 0..rows {
        let in_bed = interval_between(
            table.clock(row, BEDTIME)?,
            table.clock(row, OUT_OF_BED)?,
            IntervalPolicy::TIME_IN_BED,
        )?;
        let asleep = interval_between(
            table.clock(row, FALL_ASLEEP)?,
            table.clock(row, WAKE_TIME)?,
            IntervalPolicy::SLEEP_PERIOD,
        )?;
        let awake_minutes = match (table.number(row, AWAKENING)?, table.number(row, LATENCY)?) {
            (Some(a), Some(l)) => Some(a + l),
            _ => None,
        };
        let total = match (asleep.duration_hours, awake_minutes) {
            (Some(s), Some(m)) => Some(s - m / 60.0).filter(|t| *t >= 0.0),
            _ => None,
        };
        let se = match (total, in_bed.duration_hours) {
            (Some(t), Some(b)) if b != 0.0 => Some(t / b),
            _ => None,
        };
        implausible.push(se.is_some_and(|e| e > 1.0) || in_bed.duration_hours == Some(0.0));

        tib.push(Value::from_option(in_bed.duration_hours));
        tib_flag.push(Value::Number(in_bed.correction_flag()));
        attempt.push(Value::from_option(asleep.duration_hours));
        attempt_flag.push(Value::Number(asleep.correction_flag()));
        tst.push(Value::from_option(total));
        efficiency.push(Value::from_option(se));
    }

    table.set_column("TIB", tib)?;
    table.set_column("TIB_12", tib_flag)?;
    table.set_column("sleepattempt", attempt)?;
    table.set_column("TST_12", attempt_flag)?;
    table.set_column("TST", tst)?;
    table.set_column("SE", efficiency)?;
    blank_rows(table, &["SE", "TST", "TIB", "sleepattempt"], &implausible)?;
    debug!(
        blanked = implausible.iter().filter(|&&b| b).count(),
        "Sleep efficiency above 1 or zero time in bed"
    );

    let columns: Vec<String> = [SUB_ID, TODAYS_DATE, REDCAP_TIMESTAMP]
        .iter()
        .chain(TIME_COLUMNS.iter())
        .chain([LATENCY, AWAKENING, "TST", "TIB", "SE", "sleepattempt"].iter())
        .map(|c| c.to_string())
        .collect();
    table.select_columns("sleepvariables", &columns)
}

/// Any exercise reported in either diary format
fn derive_exercise(table: &mut Table) -> Result<()> {
    let sources = [
        "sleepdiary_exercise",
        "sleepdiary_exercise___1",
        "sleepdiary_exercise___2",
        "sleepdiary_exercise___3",
    ];
    let columns = sources
        .iter()
        .map(|c| table.numbers(c))
        .collect::<Result<Vec<_>>>()?;
    let flags = (0..table.len())
        .map(|row| {
            let any = columns.iter().any(|c| c[row].is_some_and(|n| n > 0.0));
            Value::Number(if any { 1.0 } else { 0.0 })
        })
        .collect();
    table.set_column("exercise", flags)
}

/// Fever temperature in Celsius; values outside 24-44 C blank both columns
fn derive_celsius(table: &mut Table) -> Result<usize> {
    let units = table.numbers("temp_measure")?;
    let temps = table.numbers("fever_temp")?;
    let mut celsius: Vec<Option<f64>> = units
        .iter()
        .zip(&temps)
        .map(|(unit, temp)| match (unit, temp) {
            (Some(u), Some(t)) if *u == 1.0 => Some(*t),
            (Some(u), Some(t)) if *u == 2.0 => Some((t - 32.0) * 5.0 / 9.0),
            _ => None,
        })
        .collect();
    let mut fever = temps;
    let mut blanked = 0;
    for (c, f) in celsius.iter_mut().zip(fever.iter_mut()) {
        if c.is_some_and(|c| !(24.0..=44.0).contains(&c)) {
            *c = None;
            *f = None;
            blanked += 1;
        }
    }
    table.set_column("fever_temp", fever.into_iter().map(Value::from_option).collect())?;
    table.set_column("fever_temp_C", celsius.into_iter().map(Value::from_option).collect())?;
    Ok(blanked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use covsleep_common::ClockTime;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            TABLE,
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Value::from_raw(v)).collect())
                .collect(),
        )
        .unwrap()
    }

    fn stamp(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_submission_time_prefers_wave_timestamp() {
        let mut t = table(
            &[
                UNIQUE_ID,
                LONG_TIMESTAMP,
                SHORT_TIMESTAMP,
                APRIL18_TIMESTAMP,
                APRIL18_COMPLETE,
                NOV15_TIMESTAMP,
                NOV15_COMPLETE,
            ],
            &[
                &["1L", "2020-04-01 10:00:00", "", "", "", "", ""],
                &["2S", "", "2020-04-02 11:00:00", "", "", "", ""],
                &["3LA", "", "", "2020-04-18 09:00:00", "2", "", ""],
                &["4LB", "", "", "", "", "2020-11-15 08:00:00", "2"],
            ],
        );
        derive_submission_time(&mut t).unwrap();
        assert_eq!(t.timestamp(0, REDCAP_TIMESTAMP).unwrap(), Some(stamp("2020-04-01 10:00:00")));
        assert_eq!(t.timestamp(1, REDCAP_TIMESTAMP).unwrap(), Some(stamp("2020-04-02 11:00:00")));
        assert_eq!(t.timestamp(2, REDCAP_TIMESTAMP).unwrap(), Some(stamp("2020-04-18 09:00:00")));
        assert_eq!(t.timestamp(3, REDCAP_TIMESTAMP).unwrap(), Some(stamp("2020-11-15 08:00:00")));
    }

    #[test]
    fn test_missing_submission_time_is_invariant() {
        let mut t = table(
            &[
                UNIQUE_ID,
                LONG_TIMESTAMP,
                SHORT_TIMESTAMP,
                APRIL18_TIMESTAMP,
                APRIL18_COMPLETE,
                NOV15_TIMESTAMP,
                NOV15_COMPLETE,
            ],
            &[&["1L", "", "", "", "", "", ""]],
        );
        assert!(matches!(derive_submission_time(&mut t), Err(Error::Invariant(_))));
    }

    #[test]
    fn test_not_completed_rows_dropped() {
        let mut t = table(
            &[LONG_TIMESTAMP, SHORT_TIMESTAMP],
            &[
                &["[not completed]", ""],
                &["2020-04-01 10:00:00", ""],
                &["", "[not completed]"],
            ],
        );
        let mut report = RunReport::default();
        assert_eq!(drop_not_completed(&mut t, &mut report).unwrap(), 2);
        assert_eq!(t.len(), 1);
        assert_eq!(report.dropped["daily"]["not_completed"], 2);
    }

    fn dated(rows: &[(&str, &str, &str)]) -> Table {
        let rows: Vec<Vec<&str>> = rows
            .iter()
            .enumerate()
            .map(|(i, (sub, today, submitted))| {
                vec![["1L", "2L", "3L", "4L", "5L"][i], *sub, *today, *submitted, "", ""]
            })
            .collect();
        let refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        let mut t = table(
            &[
                UNIQUE_ID,
                SUB_ID,
                TODAYS_DATE,
                REDCAP_TIMESTAMP,
                LONG_TIMESTAMP,
                SHORT_TIMESTAMP,
            ],
            &refs,
        );
        parse_timestamps(&mut t, TODAYS_DATE).unwrap();
        parse_timestamps(&mut t, REDCAP_TIMESTAMP).unwrap();
        t
    }

    #[test]
    fn test_reference_date_rules() {
        let mut t = dated(&[
            ("7", "2020-05-10 09:00:00", "2020-05-10 09:05:00"),
            ("7", "2020-05-12 03:30:00", "2020-05-12 03:35:00"),
            ("8", "2020-05-10 10:00:00", "2020-05-10 10:00:00"),
            ("8", "2020-05-10 20:00:00", "2020-05-10 20:00:00"),
            ("9", "2020-05-20 10:00:00", "2020-05-15 10:00:00"),
        ]);
        let problems = assign_reference_dates(&mut t).unwrap();
        // Same-day duplicates of subject 8 and the far-off row of subject 9
        assert_eq!(problems.len(), 3);
        assert_eq!(t.timestamp(0, REF_DATE).unwrap(), Some(stamp("2020-05-09 00:00:00")));
        // Early-morning diary goes back a further day
        assert_eq!(t.timestamp(1, REF_DATE).unwrap(), Some(stamp("2020-05-10 00:00:00")));
        assert_eq!(t.timestamp(2, REF_DATE).unwrap(), None);
        assert_eq!(t.number(0, DAYS_ELAPSED).unwrap(), Some(0.0));
        assert_eq!(t.number(1, DAYS_ELAPSED).unwrap(), Some(1.0));
        assert_eq!(t.number(4, DAYS_ELAPSED).unwrap(), None);
    }

    fn diary(rows: &[[&str; 6]]) -> Table {
        let mut columns = vec![SUB_ID, TODAYS_DATE, REDCAP_TIMESTAMP];
        columns.extend(TIME_COLUMNS);
        columns.extend([LATENCY, AWAKENING]);
        let rows: Vec<Vec<&str>> = rows
            .iter()
            .map(|r| {
                let mut row = vec!["1", "", ""];
                row.extend(r.iter().copied());
                row
            })
            .collect();
        let refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        let mut t = table(&columns, &refs);
        for c in TIME_COLUMNS {
            parse_clocks(&mut t, c).unwrap();
        }
        t
    }

    #[test]
    fn test_sleep_variables() {
        let mut t = diary(&[
            ["23:00", "23:30", "7:00", "7:30", "30", "30"],
            ["23:00", "23:00", "7:00", "6:00", "0", "0"],
            ["23:00", "23:30", "0:00", "7:30", "30", "30"],
        ]);
        let audit = derive_sleep_variables(&mut t).unwrap();
        assert_eq!(t.number(0, "TIB").unwrap(), Some(8.5));
        assert_eq!(t.number(0, "sleepattempt").unwrap(), Some(7.5));
        assert_eq!(t.number(0, "TST").unwrap(), Some(6.5));
        assert_eq!(t.number(0, "SE").unwrap(), Some(6.5 / 8.5));
        // Slept longer than in bed
        assert_eq!(t.number(1, "SE").unwrap(), None);
        assert_eq!(t.number(1, "TIB").unwrap(), None);
        assert_eq!(t.number(1, "sleepattempt").unwrap(), None);
        assert_eq!(t.number(1, "TIB_12").unwrap(), Some(0.0));
        // Half an hour of attempt minus an hour awake
        assert_eq!(t.number(2, "TST").unwrap(), None);
        assert_eq!(audit.len(), 3);
        assert!(audit.has_column(BEDTIME));
        assert_eq!(
            t.clock(0, BEDTIME).unwrap(),
            Some(ClockTime::from_hms(23, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_conditional_zero() {
        let mut t = table(&["sleepdiary_nap", "sleepdiary_naptime"], &[&["0", ""], &["1", "20"]]);
        zero_when_none(&mut t, "sleepdiary_nap", "sleepdiary_naptime").unwrap();
        assert_eq!(t.numbers("sleepdiary_naptime").unwrap(), vec![Some(0.0), Some(20.0)]);
    }

    #[test]
    fn test_quarantine_longer_than_pandemic() {
        let mut t = table(
            &[REDCAP_TIMESTAMP, "quarantine_days"],
            &[&["2020-02-02 12:00:00", "11"], &["2020-02-02 12:00:00", "10"], &["2020-02-02 12:00:00", ""]],
        );
        parse_timestamps(&mut t, REDCAP_TIMESTAMP).unwrap();
        assert_eq!(blank_impossible_quarantine(&mut t).unwrap(), 1);
        assert_eq!(t.numbers("quarantine_days").unwrap(), vec![None, Some(10.0), None]);
    }

    #[test]
    fn test_celsius_conversion() {
        let mut t = table(
            &["temp_measure", "fever_temp"],
            &[&["1", "37.5"], &["2", "212"], &["2", "98.6"], &["", "37"]],
        );
        assert_eq!(derive_celsius(&mut t).unwrap(), 1);
        assert_eq!(t.number(0, "fever_temp_C").unwrap(), Some(37.5));
        assert_eq!(t.number(1, "fever_temp").unwrap(), None);
        assert_eq!(t.number(1, "fever_temp_C").unwrap(), None);
        let c = t.number(2, "fever_temp_C").unwrap().unwrap();
        assert!((c - 37.0).abs() < 1e-9);
        assert_eq!(t.number(3, "fever_temp_C").unwrap(), None);
        assert_eq!(t.number(3, "fever_temp").unwrap(), Some(37.0));
    }

    #[test]
    fn test_exercise_flag() {
        let mut t = table(
            &[
                "sleepdiary_exercise",
                "sleepdiary_exercise___1",
                "sleepdiary_exercise___2",
                "sleepdiary_exercise___3",
            ],
            &[&["", "", "1", ""], &["0", "0", "0", "0"], &["", "", "", ""]],
        );
        derive_exercise(&mut t).unwrap();
        assert_eq!(
            t.numbers("exercise").unwrap(),
            vec![Some(1.0), Some(0.0), Some(0.0)]
        );
    }
}
