//! Numeric and date plausibility rules
//!
//! Implausible values become missing rather than being clamped to a boundary.
//! Every function returns how many cells it blanked so the caller can record
//! the plausibility warning in the run report.

use covsleep_common::time::{parse_timestamp, NOT_COMPLETED};
use covsleep_common::{Result, Table, Value};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

fn blank_numbers_where<F>(table: &mut Table, column: &str, implausible: F) -> Result<usize>
where
    F: Fn(f64) -> bool,
{
    let mut blanked = 0;
    table.map_column(column, |v| match v.as_number()? {
        Some(n) if implausible(n) => {
            blanked += 1;
            Ok(Value::Missing)
        }
        other => Ok(Value::from_option(other)),
    })?;
    if blanked > 0 {
        debug!(table = table.name(), column, blanked, "Blanked implausible values");
    }
    Ok(blanked)
}

/// Parse a column as numbers; non-numeric text is a format error
pub fn coerce_numeric(table: &mut Table, column: &str) -> Result<()> {
    table.map_column(column, |v| Ok(Value::from_option(v.as_number()?)))
}

/// Values strictly greater than `max` become missing
pub fn blank_above(table: &mut Table, column: &str, max: f64) -> Result<usize> {
    blank_numbers_where(table, column, |n| n > max)
}

/// Values strictly less than `min` become missing
pub fn blank_below(table: &mut Table, column: &str, min: f64) -> Result<usize> {
    blank_numbers_where(table, column, |n| n < min)
}

/// Values outside `[min, max]` become missing
pub fn blank_outside(table: &mut Table, column: &str, min: f64, max: f64) -> Result<usize> {
    blank_numbers_where(table, column, |n| n < min || n > max)
}

/// Add a constant, e.g. to move a 1-based code to start at 0
pub fn shift(table: &mut Table, column: &str, delta: f64) -> Result<()> {
    table.map_column(column, |v| Ok(Value::from_option(v.as_number()?.map(|n| n + delta))))
}

pub fn scale(table: &mut Table, column: &str, factor: f64) -> Result<()> {
    table.map_column(column, |v| Ok(Value::from_option(v.as_number()?.map(|n| n * factor))))
}

/// Raw text sentinels standing for "no answer" become missing
pub fn blank_sentinels(table: &mut Table, column: &str, sentinels: &[&str]) -> Result<usize> {
    let mut blanked = 0;
    table.map_column(column, |v| match v.as_text() {
        Some(s) if sentinels.contains(&s.trim()) => {
            blanked += 1;
            Ok(Value::Missing)
        }
        _ => Ok(v.clone()),
    })?;
    Ok(blanked)
}

/// Survey-platform marker for an unfinished instrument becomes missing
pub fn blank_not_completed(table: &mut Table, column: &str) -> Result<usize> {
    blank_sentinels(table, column, &[NOT_COMPLETED])
}

/// Replace exact raw text with a corrected raw text
pub fn replace_text(table: &mut Table, column: &str, from: &str, to: &str) -> Result<usize> {
    let mut replaced = 0;
    table.map_column(column, |v| match v.as_text() {
        Some(s) if s == from => {
            replaced += 1;
            Ok(Value::from(to))
        }
        _ => Ok(v.clone()),
    })?;
    Ok(replaced)
}

/// Parse a column as timestamps
pub fn parse_timestamps(table: &mut Table, column: &str) -> Result<()> {
    table.map_column(column, |v| Ok(Value::from_option(v.as_timestamp()?)))
}

/// Parse a column as clock times; cells without `H:MM` are format errors
pub fn parse_clocks(table: &mut Table, column: &str) -> Result<()> {
    table.map_column(column, |v| Ok(Value::from_option(v.as_clock()?)))
}

fn blank_timestamps_where<F>(table: &mut Table, column: &str, implausible: F) -> Result<usize>
where
    F: Fn(&NaiveDateTime) -> bool,
{
    let mut blanked = 0;
    table.map_column(column, |v| match v.as_timestamp()? {
        Some(t) if implausible(&t) => {
            blanked += 1;
            Ok(Value::Missing)
        }
        other => Ok(Value::from_option(other)),
    })?;
    Ok(blanked)
}

/// Dates before `first` become missing
pub fn blank_dates_before(table: &mut Table, column: &str, first: NaiveDate) -> Result<usize> {
    blank_timestamps_where(table, column, |t| t.date() < first)
}

/// Dates after `last` become missing
pub fn blank_dates_after(table: &mut Table, column: &str, last: NaiveDate) -> Result<usize> {
    blank_timestamps_where(table, column, |t| t.date() > last)
}

/// Parse free-text numbers with known fixes; unparseable answers become missing
///
/// Comma decimal separators are accepted. Returns the answers that could not be
/// read, for the audit list.
pub fn coerce_numeric_lenient(
    table: &mut Table,
    column: &str,
    fixes: &[(&str, f64)],
) -> Result<Vec<String>> {
    let mut rejected = Vec::new();
    table.map_column(column, |v| {
        let Some(text) = v.as_text() else {
            return Ok(v.clone());
        };
        let text = text.trim();
        if let Some((_, n)) = fixes.iter().find(|(raw, _)| *raw == text) {
            return Ok(Value::Number(*n));
        }
        match text.replace(',', ".").parse::<f64>() {
            Ok(n) => Ok(Value::from(n)),
            Err(_) => {
                rejected.push(text.to_string());
                Ok(Value::Missing)
            }
        }
    })?;
    if !rejected.is_empty() {
        warn!(
            table = table.name(),
            column,
            values = ?rejected,
            "Replacing non-numeric answers with missing"
        );
    }
    Ok(rejected)
}

/// True when a raw cell holds a timestamp that is exactly one of `sentinels`
pub fn is_sentinel_date(value: &Value, sentinels: &[&str]) -> Result<bool> {
    match value.as_text() {
        Some(s) => {
            let s = s.trim();
            if sentinels.contains(&s) {
                return Ok(true);
            }
            let parsed = parse_timestamp(s)?;
            Ok(parsed.is_some_and(|t| {
                sentinels
                    .iter()
                    .any(|sentinel| t.date().format("%Y-%m-%d").to_string() == *sentinel)
            }))
        }
        None => Ok(false),
    }
}

/// Date columns with "no answer" sentinel dates become missing, then are parsed
pub fn parse_dates_with_sentinels(
    table: &mut Table,
    column: &str,
    sentinels: &[&str],
) -> Result<usize> {
    let mut blanked = 0;
    table.map_column(column, |v| {
        if is_sentinel_date(v, sentinels)? {
            blanked += 1;
            return Ok(Value::Missing);
        }
        Ok(Value::from_option(v.as_timestamp()?))
    })?;
    Ok(blanked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use covsleep_common::time::date;

    fn table(values: &[&str]) -> Table {
        Table::from_rows(
            "t",
            vec!["x".to_string()],
            values.iter().map(|v| vec![Value::from_raw(v)]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_blank_above_keeps_boundary() {
        let mut t = table(&["24", "24.5", "", "3"]);
        assert_eq!(blank_above(&mut t, "x", 24.0).unwrap(), 1);
        assert_eq!(t.numbers("x").unwrap(), vec![Some(24.0), None, None, Some(3.0)]);
    }

    #[test]
    fn test_blank_outside() {
        let mut t = table(&["-1", "0", "1", "2"]);
        assert_eq!(blank_outside(&mut t, "x", 0.0, 1.0).unwrap(), 2);
    }

    #[test]
    fn test_non_numeric_is_format_error() {
        let mut t = table(&["seven"]);
        assert!(blank_above(&mut t, "x", 7.0).is_err());
    }

    #[test]
    fn test_shift_and_scale() {
        let mut t = table(&["1", "", "4"]);
        shift(&mut t, "x", -1.0).unwrap();
        scale(&mut t, "x", 0.5).unwrap();
        assert_eq!(t.numbers("x").unwrap(), vec![Some(0.0), None, Some(1.5)]);
    }

    #[test]
    fn test_lenient_numbers() {
        let mut t = table(&["37,5", "100.2 this morning", "hot", "38"]);
        let rejected =
            coerce_numeric_lenient(&mut t, "x", &[("100.2 this morning", 100.2)]).unwrap();
        assert_eq!(rejected, vec!["hot"]);
        assert_eq!(
            t.numbers("x").unwrap(),
            vec![Some(37.5), Some(100.2), None, Some(38.0)]
        );
    }

    #[test]
    fn test_dates_before_and_sentinels() {
        let mut t = table(&["9999-09-09", "2020-05-01", "2019-12-31"]);
        assert_eq!(parse_dates_with_sentinels(&mut t, "x", &["9999-09-09"]).unwrap(), 1);
        let first = date(2020, 1, 1).unwrap();
        assert_eq!(blank_dates_before(&mut t, "x", first).unwrap(), 1);
        assert!(t.get(1, "x").unwrap().as_timestamp().unwrap().is_some());
        assert!(t.get(2, "x").unwrap().is_missing());
    }

    #[test]
    fn test_not_completed_marker() {
        let mut t = table(&["[not completed]", "2020-04-01 10:00:00"]);
        assert_eq!(blank_not_completed(&mut t, "x").unwrap(), 1);
        parse_timestamps(&mut t, "x").unwrap();
        assert!(t.get(0, "x").unwrap().is_missing());
    }
}
