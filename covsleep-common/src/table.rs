//! In-memory table model
//!
//! Each raw survey export becomes one [`Table`]: a named polars [`DataFrame`]
//! whose columns load as text and are retyped as the cleaning stages parse
//! them. A column holds one kind of [`Value`]:
//!
//! | Value       | Column type                |
//! |-------------|----------------------------|
//! | `Number`    | `Float64`                  |
//! | `Clock`     | `Time`                     |
//! | `Timestamp` | `Datetime(Milliseconds)`   |
//! | `Text`      | `String`                   |
//!
//! A column mixing kinds is stored as text and reads back as [`Value::Text`];
//! the numeric, clock and timestamp views parse text, so nothing is lost.
//!
//! Column lookups that miss are invariant violations: every stage works against
//! a fixed instrument schema, so an absent column means the export changed.

use crate::clock::ClockTime;
use crate::time::parse_timestamp;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashSet;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const ROW_INDEX: &str = "__row";

/// One cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Text(String),
    Number(f64),
    Clock(ClockTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Raw text from a CSV cell; empty cells are missing
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            Value::Missing
        } else {
            Value::Text(raw.to_string())
        }
    }

    pub fn from_option<T: Into<Value>>(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Missing)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view: numbers as-is, numeric text parsed, missing as `None`
    pub fn as_number(&self) -> Result<Option<f64>> {
        match self {
            Value::Missing => Ok(None),
            Value::Number(n) => Ok(Some(*n)),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| Error::format(format!("'{}' is not numeric", s))),
            Value::Clock(c) => Err(Error::format(format!("clock time {} used as a number", c))),
            Value::Timestamp(t) => Err(Error::format(format!("timestamp {} used as a number", t))),
        }
    }

    /// Text view; non-text cells are `None`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_clock(&self) -> Result<Option<ClockTime>> {
        match self {
            Value::Missing => Ok(None),
            Value::Clock(c) => Ok(Some(*c)),
            Value::Text(s) => ClockTime::parse(s).map(Some),
            other => Err(Error::format(format!("{:?} is not a clock time", other))),
        }
    }

    pub fn as_timestamp(&self) -> Result<Option<NaiveDateTime>> {
        match self {
            Value::Missing => Ok(None),
            Value::Timestamp(t) => Ok(Some(*t)),
            Value::Text(s) => parse_timestamp(s),
            other => Err(Error::format(format!("{:?} is not a timestamp", other))),
        }
    }

    /// Key used for equality checks on identifiers and record ids
    pub fn key_text(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Clock(c) => c.to_string(),
            Value::Timestamp(t) => t.to_string(),
        }
    }

    fn kind(&self) -> Option<Kind> {
        match self {
            Value::Missing => None,
            Value::Text(_) => Some(Kind::Text),
            Value::Number(_) => Some(Kind::Number),
            Value::Clock(_) => Some(Kind::Clock),
            Value::Timestamp(_) => Some(Kind::Timestamp),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        if n.is_nan() {
            Value::Missing
        } else {
            Value::Number(n)
        }
    }
}

impl From<ClockTime> for Value {
    fn from(c: ClockTime) -> Self {
        Value::Clock(c)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(t: NaiveDateTime) -> Self {
        Value::Timestamp(t)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Integral values without a fractional part, others in shortest form
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Storage kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Number,
    Clock,
    Timestamp,
}

/// Common kind of every non-missing value; mixed and empty columns are text
fn kind_of<'a>(values: impl IntoIterator<Item = &'a Value>) -> Kind {
    let mut found = None;
    for kind in values.into_iter().filter_map(Value::kind) {
        match found {
            None => found = Some(kind),
            Some(k) if k == kind => {}
            Some(_) => return Kind::Text,
        }
    }
    found.unwrap_or(Kind::Text)
}

fn to_series(name: &str, values: &[Value]) -> Result<Series> {
    to_series_as(name, values, kind_of(values))
}

fn to_series_as(name: &str, values: &[Value], kind: Kind) -> Result<Series> {
    let series = match kind {
        Kind::Number => {
            let numbers: Vec<Option<f64>> = values
                .iter()
                .map(|v| match v {
                    Value::Number(n) => Some(*n),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), numbers)
        }
        Kind::Clock => {
            let nanos: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Value::Clock(c) => Some(c.seconds() * NANOS_PER_SECOND),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), nanos).cast(&DataType::Time)?
        }
        Kind::Timestamp => {
            let millis: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Value::Timestamp(t) => Some(t.and_utc().timestamp_millis()),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        Kind::Text => {
            let texts: Vec<Option<String>> = values
                .iter()
                .map(|v| match v {
                    Value::Missing => None,
                    Value::Text(s) => Some(s.clone()),
                    other => Some(other.key_text()),
                })
                .collect();
            Series::new(name.into(), texts)
        }
    };
    Ok(series)
}

fn clock_from_nanos(nanos: i64) -> Result<Value> {
    ClockTime::from_seconds(nanos / NANOS_PER_SECOND).map(Value::Clock)
}

fn timestamp_from(raw: i64, unit: TimeUnit) -> Result<Value> {
    let per_second = match unit {
        TimeUnit::Milliseconds => 1_000,
        TimeUnit::Microseconds => 1_000_000,
        TimeUnit::Nanoseconds => NANOS_PER_SECOND,
    };
    let seconds = raw.div_euclid(per_second);
    let nanos = raw.rem_euclid(per_second) * (NANOS_PER_SECOND / per_second);
    DateTime::from_timestamp(seconds, nanos as u32)
        .map(|t| Value::Timestamp(t.naive_utc()))
        .ok_or_else(|| Error::invariant(format!("timestamp {} is out of range", raw)))
}

/// Every cell of a column as values
fn series_values(series: &Series) -> Result<Vec<Value>> {
    match series.dtype() {
        DataType::Float64 => Ok(series.f64()?.into_iter().map(Value::from_option).collect()),
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Missing, Value::from))
            .collect()),
        DataType::Time => {
            let physical = series.to_physical_repr();
            physical
                .i64()?
                .into_iter()
                .map(|v| v.map_or(Ok(Value::Missing), clock_from_nanos))
                .collect()
        }
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let physical = series.to_physical_repr();
            physical
                .i64()?
                .into_iter()
                .map(|v| v.map_or(Ok(Value::Missing), |raw| timestamp_from(raw, unit)))
                .collect()
        }
        DataType::Null => Ok(vec![Value::Missing; series.len()]),
        other => Err(Error::invariant(format!(
            "column '{}' has unsupported type {}",
            series.name(),
            other
        ))),
    }
}

/// One cell of a column; `row` must be in bounds
fn series_value(series: &Series, row: usize) -> Result<Value> {
    match series.dtype() {
        DataType::Float64 => Ok(Value::from_option(series.f64()?.get(row))),
        DataType::String => Ok(series.str()?.get(row).map_or(Value::Missing, Value::from)),
        DataType::Time => {
            let physical = series.to_physical_repr();
            let raw = physical.i64()?.get(row);
            raw.map_or(Ok(Value::Missing), clock_from_nanos)
        }
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let physical = series.to_physical_repr();
            let raw = physical.i64()?.get(row);
            raw.map_or(Ok(Value::Missing), |raw| timestamp_from(raw, unit))
        }
        DataType::Null => Ok(Value::Missing),
        other => Err(Error::invariant(format!(
            "column '{}' has unsupported type {}",
            series.name(),
            other
        ))),
    }
}

/// Sort key for a column: numeric when every value reads as a number
fn sort_key(name: &str, values: &[Value]) -> Result<Series> {
    let numbers: Option<Vec<Option<f64>>> = values.iter().map(|v| v.as_number().ok()).collect();
    match numbers {
        Some(numbers) => Ok(Series::new(name.into(), numbers)),
        None => to_series(name, values),
    }
}

fn check_unique(name: &str, columns: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(columns.len());
    for col in columns {
        if !seen.insert(col.as_str()) {
            return Err(Error::invariant(format!(
                "table {} has duplicate column '{}'",
                name, col
            )));
        }
    }
    Ok(())
}

/// Named table of survey responses
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    frame: DataFrame,
}

impl Table {
    /// Empty table with the given header; duplicate names are rejected
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Result<Self> {
        Self::from_rows(name, columns, Vec::new())
    }

    /// Table from header and row values; every row must match the header width
    pub fn from_rows(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let name = name.into();
        check_unique(&name, &columns)?;
        let mut cells: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); columns.len()];
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::invariant(format!(
                    "table {}: row {} has {} cells but header has {} columns",
                    name,
                    i,
                    row.len(),
                    columns.len()
                )));
            }
            for (column, value) in cells.iter_mut().zip(row) {
                column.push(value);
            }
        }
        let series = columns
            .iter()
            .zip(&cells)
            .map(|(column, values)| to_series(column, values).map(Column::from))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name,
            frame: DataFrame::new(series)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Underlying frame, read-only
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Column names in header order
    pub fn columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.frame.get_column_index(column).is_some()
    }

    fn no_column(&self, column: &str) -> Error {
        Error::invariant(format!("table {} has no column '{}'", self.name, column))
    }

    fn series(&self, column: &str) -> Result<&Series> {
        match self.frame.column(column) {
            Ok(c) => Ok(c.as_materialized_series()),
            Err(_) => Err(self.no_column(column)),
        }
    }

    pub fn get(&self, row: usize, column: &str) -> Result<Value> {
        let series = self.series(column)?;
        if row >= self.len() {
            return Err(Error::invariant(format!("table {} has no row {}", self.name, row)));
        }
        series_value(series, row)
    }

    pub fn set(&mut self, row: usize, column: &str, value: Value) -> Result<()> {
        let mut values = self.column_values(column)?;
        let cell = values
            .get_mut(row)
            .ok_or_else(|| Error::invariant(format!("table {} has no row {}", self.name, row)))?;
        *cell = value;
        self.set_column(column, values)
    }

    pub fn number(&self, row: usize, column: &str) -> Result<Option<f64>> {
        self.get(row, column)?
            .as_number()
            .map_err(|e| self.cell_error(row, column, e))
    }

    pub fn clock(&self, row: usize, column: &str) -> Result<Option<ClockTime>> {
        self.get(row, column)?
            .as_clock()
            .map_err(|e| self.cell_error(row, column, e))
    }

    pub fn timestamp(&self, row: usize, column: &str) -> Result<Option<NaiveDateTime>> {
        self.get(row, column)?
            .as_timestamp()
            .map_err(|e| self.cell_error(row, column, e))
    }

    /// Every value of a column as numbers
    pub fn numbers(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let series = self.series(column)?;
        if series.dtype() == &DataType::Float64 {
            return Ok(series.f64()?.into_iter().collect());
        }
        series_values(series)?
            .iter()
            .enumerate()
            .map(|(row, v)| v.as_number().map_err(|e| self.cell_error(row, column, e)))
            .collect()
    }

    fn cell_error(&self, row: usize, column: &str, err: Error) -> Error {
        match err {
            Error::Format(msg) => Error::Format(format!("{}.{} row {}: {}", self.name, column, row, msg)),
            other => other,
        }
    }

    /// Add a column, or overwrite it in place when it already exists
    pub fn set_column(&mut self, column: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.len() {
            return Err(Error::invariant(format!(
                "table {}: column '{}' has {} values for {} rows",
                self.name,
                column,
                values.len(),
                self.len()
            )));
        }
        self.frame.with_column(to_series(column, &values)?)?;
        Ok(())
    }

    /// Copy of one column's values
    pub fn column_values(&self, column: &str) -> Result<Vec<Value>> {
        series_values(self.series(column)?)
    }

    /// Apply a fallible conversion to every cell of a column
    pub fn map_column<F>(&mut self, column: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Value) -> Result<Value>,
    {
        let mapped = self
            .column_values(column)?
            .iter()
            .enumerate()
            .map(|(row, v)| f(v).map_err(|e| self.cell_error(row, column, e)))
            .collect::<Result<Vec<_>>>()?;
        self.set_column(column, mapped)
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if !self.has_column(from) {
            return Err(self.no_column(from));
        }
        if from == to {
            return Ok(());
        }
        if self.has_column(to) {
            return Err(Error::invariant(format!(
                "table {}: cannot rename '{}' to existing column '{}'",
                self.name, from, to
            )));
        }
        self.frame.rename(from, to.into())?;
        Ok(())
    }

    /// Rename when present; returns whether a rename happened
    pub fn rename_if_present(&mut self, from: &str, to: &str) -> Result<bool> {
        if self.has_column(from) {
            self.rename_column(from, to)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Drop columns; every name must exist
    pub fn drop_columns(&mut self, columns: &[&str]) -> Result<()> {
        if let Some(missing) = columns.iter().find(|c| !self.has_column(c)) {
            return Err(self.no_column(missing));
        }
        let keep: Vec<String> = self
            .columns()
            .into_iter()
            .filter(|c| !columns.contains(&c.as_str()))
            .collect();
        self.frame = self.frame.select(keep)?;
        Ok(())
    }

    /// Move a column to the front of the header
    pub fn move_to_front(&mut self, column: &str) -> Result<()> {
        if !self.has_column(column) {
            return Err(self.no_column(column));
        }
        let mut order = vec![column.to_string()];
        order.extend(self.columns().into_iter().filter(|c| c != column));
        self.frame = self.frame.select(order)?;
        Ok(())
    }

    /// Column names from `start` to `end` inclusive, in header order
    pub fn columns_between(&self, start: &str, end: &str) -> Result<Vec<String>> {
        let a = self
            .frame
            .get_column_index(start)
            .ok_or_else(|| self.no_column(start))?;
        let b = self
            .frame
            .get_column_index(end)
            .ok_or_else(|| self.no_column(end))?;
        if a > b {
            return Err(Error::invariant(format!(
                "table {}: column '{}' comes after '{}'",
                self.name, start, end
            )));
        }
        Ok(self.columns()[a..=b].to_vec())
    }

    /// Column names starting with a prefix, in header order
    pub fn columns_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.columns()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    /// New table holding only the named columns, in the given order
    pub fn select_columns(&self, name: &str, columns: &[String]) -> Result<Table> {
        check_unique(name, columns)?;
        if let Some(missing) = columns.iter().find(|c| !self.has_column(c)) {
            return Err(self.no_column(missing));
        }
        Ok(Table {
            name: name.to_string(),
            frame: self.frame.select(columns.iter().map(|c| c.as_str()))?,
        })
    }

    /// Keep rows whose mask entry is true; returns the number dropped
    pub fn retain_rows(&mut self, mask: &[bool]) -> Result<usize> {
        if mask.len() != self.len() {
            return Err(Error::invariant(format!(
                "table {}: row mask has {} entries for {} rows",
                self.name,
                mask.len(),
                self.len()
            )));
        }
        let before = self.len();
        let mask = BooleanChunked::from_slice("keep".into(), mask);
        self.frame = self.frame.filter(&mask)?;
        Ok(before - self.len())
    }

    /// Drop the first `n` rows
    pub fn skip_rows(&mut self, n: usize) {
        let n = n.min(self.len());
        self.frame = self.frame.slice(n as i64, self.len() - n);
    }

    /// Stable sort by a list of columns; missing values sort last
    pub fn sort_by_columns(&mut self, columns: &[&str]) -> Result<()> {
        let keys = columns
            .iter()
            .map(|c| self.column_values(c))
            .collect::<Result<Vec<_>>>()?;
        self.sort_by_keys(&keys)
    }

    /// Stable sort by derived key columns, one value per row each
    ///
    /// A key whose values all read as numbers sorts numerically; other keys
    /// sort by their column type (timestamps chronologically, text lexically).
    pub fn sort_by_keys(&mut self, keys: &[Vec<Value>]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let height = self.len();
        let mut columns = Vec::with_capacity(keys.len() + 1);
        let mut by = Vec::with_capacity(keys.len());
        for (i, values) in keys.iter().enumerate() {
            if values.len() != height {
                return Err(Error::invariant(format!(
                    "table {}: sort key {} has {} values for {} rows",
                    self.name,
                    i,
                    values.len(),
                    height
                )));
            }
            let name = format!("key_{}", i);
            columns.push(Column::from(sort_key(&name, values)?));
            by.push(name);
        }
        let rows: Vec<IdxSize> = (0..height as IdxSize).collect();
        columns.push(Column::from(Series::new(ROW_INDEX.into(), rows)));

        let sorted = DataFrame::new(columns)?.sort(
            by,
            SortMultipleOptions::default()
                .with_maintain_order(true)
                .with_nulls_last(true),
        )?;
        let order = sorted.column(ROW_INDEX)?.as_materialized_series().idx()?.clone();
        self.frame = self.frame.take(&order)?;
        Ok(())
    }

    /// Append another table's rows, taking the union of columns
    ///
    /// Columns keep this table's order; new columns from `other` are appended.
    /// A shared column stored with different types on each side is rebuilt on
    /// both sides with the kind of the combined values.
    pub fn append(&mut self, mut other: Table) -> Result<()> {
        let own_columns = self.columns();
        let other_columns = other.columns();

        for column in &other_columns {
            if !self.has_column(column) {
                continue;
            }
            if self.series(column)?.dtype() == other.series(column)?.dtype() {
                continue;
            }
            let mine = self.column_values(column)?;
            let theirs = other.column_values(column)?;
            let kind = kind_of(mine.iter().chain(&theirs));
            self.frame.with_column(to_series_as(column, &mine, kind)?)?;
            other.frame.with_column(to_series_as(column, &theirs, kind)?)?;
        }

        for column in &other_columns {
            if !self.has_column(column) {
                let dtype = other.series(column)?.dtype().clone();
                self.frame
                    .with_column(Series::full_null(column.as_str().into(), self.len(), &dtype))?;
            }
        }
        for column in &own_columns {
            if !other.has_column(column) {
                let dtype = self.series(column)?.dtype().clone();
                other
                    .frame
                    .with_column(Series::full_null(column.as_str().into(), other.len(), &dtype))?;
            }
        }

        let aligned = other.frame.select(self.columns())?;
        self.frame.vstack_mut(&aligned)?;
        Ok(())
    }

    /// Count of missing cells per column, in header order
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.frame
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), c.null_count()))
            .collect()
    }
}
