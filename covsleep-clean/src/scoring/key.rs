//! Scoring keys for summed questionnaire scales

use covsleep_common::{Error, Result, Table, Value};

/// One contributing item column
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleItem {
    pub column: String,
    pub reverse: bool,
}

/// Fixed scoring key of one composite score
///
/// Every item shares the response range `[min, max]`; a reverse-scored item
/// contributes `min + max - value`. A missing item makes the whole composite
/// missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleKey {
    pub name: String,
    pub items: Vec<ScaleItem>,
    pub min: f64,
    pub max: f64,
}

impl ScaleKey {
    /// Plain sum of forward-scored items
    pub fn sum<I, S>(name: &str, min: f64, max: f64, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            items: items
                .into_iter()
                .map(|c| ScaleItem {
                    column: c.into(),
                    reverse: false,
                })
                .collect(),
            min,
            max,
        }
    }

    /// Add reverse-scored items
    pub fn reversed<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items.extend(items.into_iter().map(|c| ScaleItem {
            column: c.into(),
            reverse: true,
        }));
        self
    }

    /// Theoretical minimum and maximum of the composite
    pub fn bounds(&self) -> (f64, f64) {
        let n = self.items.len() as f64;
        (n * self.min, n * self.max)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.column.as_str())
    }

    /// Score one row; `None` when any item is missing
    pub fn score_row(&self, table: &Table, row: usize) -> Result<Option<f64>> {
        let mut total = 0.0;
        for item in &self.items {
            let Some(value) = table.number(row, &item.column)? else {
                return Ok(None);
            };
            total += if item.reverse {
                self.min + self.max - value
            } else {
                value
            };
        }
        let (lo, hi) = self.bounds();
        if total < lo || total > hi {
            return Err(Error::invariant(format!(
                "{}.{} row {}: score {} outside [{}, {}]",
                table.name(),
                self.name,
                row,
                total,
                lo,
                hi
            )));
        }
        Ok(Some(total))
    }

    /// Add (or overwrite) the composite column
    pub fn apply(&self, table: &mut Table) -> Result<()> {
        let scores = (0..table.len())
            .map(|row| Ok(Value::from_option(self.score_row(table, row)?)))
            .collect::<Result<Vec<_>>>()?;
        table.set_column(&self.name, scores)
    }
}

/// `prefix1 ..= prefixN` item names
pub fn numbered(prefix: &str, range: std::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(|i| format!("{}{}", prefix, i)).collect()
}

/// Named items with a common prefix
pub fn prefixed(prefix: &str, numbers: &[u32]) -> Vec<String> {
    numbers.iter().map(|i| format!("{}{}", prefix, i)).collect()
}
