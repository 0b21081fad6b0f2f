//! Per-table identity reconciliation
//!
//! **Steps (in order):**
//! 1. Drop rows with a missing identifier or required column
//! 2. Normalize identifiers (trim, uppercase, zero-width spaces)
//! 3. Apply the correction table
//! 4. Drop excluded identifiers
//! 5. Drop identifiers absent from the roster (kept for the audit file)
//! 6. Map to canonical ids and rename the identifier column to `sub_id`
//! 7. Build the daily composite key; check record keys are unique
//! 8. Sort by `sub_id`, then the table's secondary key
//! 9. Apply the table's duplicate policy to the sorted rows

use super::{normalize_identifier, Corrections, Roster};
use crate::sources::{
    DuplicatePolicy, TableKey, APRIL18_COMPLETE, LONG_INSTRUMENT, NOV15_COMPLETE,
    SHORT_INSTRUMENT, SUB_ID, UNIQUE_ID,
};
use covsleep_common::{Error, Result, Table, Value};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Row counts for one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub input_rows: usize,
    pub missing_key: usize,
    pub excluded: usize,
    pub not_in_roster: usize,
    pub duplicates_dropped: usize,
    pub output_rows: usize,
    /// Identifiers (after correction) that the roster does not know, in row order
    pub unknown_ids: Vec<String>,
}

/// Applies roster, corrections and exclusions to every source table
#[derive(Debug)]
pub struct Reconciler<'a> {
    roster: &'a Roster,
    corrections: &'a Corrections,
    exclusions: HashSet<String>,
}

impl<'a> Reconciler<'a> {
    pub fn new(roster: &'a Roster, corrections: &'a Corrections, exclusions: &[String]) -> Self {
        Self {
            roster,
            corrections,
            exclusions: exclusions.iter().map(|e| normalize_identifier(e)).collect(),
        }
    }

    /// Reconcile every table; results keep the input order
    pub fn reconcile_all(
        &self,
        tables: Vec<(TableKey, Table)>,
    ) -> Result<Vec<(TableKey, Table, ReconcileStats)>> {
        tables
            .into_iter()
            .map(|(key, table)| {
                let (table, stats) = self.reconcile(key, table)?;
                Ok((key, table, stats))
            })
            .collect()
    }

    pub fn reconcile(&self, key: TableKey, mut table: Table) -> Result<(Table, ReconcileStats)> {
        let spec = key.spec();
        let mut stats = ReconcileStats {
            input_rows: table.len(),
            ..Default::default()
        };

        // 1. Missing identifier or required column
        let mut keep = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let mut present = !table.get(row, spec.id_column)?.is_missing();
            for col in spec.required_columns {
                present &= !table.get(row, col)?.is_missing();
            }
            keep.push(present);
        }
        stats.missing_key = table.retain_rows(&keep)?;

        // 2-3. Normalize, then correct
        let ids: Vec<String> = table
            .column_values(spec.id_column)?
            .iter()
            .map(|v| {
                let id = normalize_identifier(&v.key_text());
                match self.corrections.correct(&id) {
                    Some(fixed) => fixed.to_string(),
                    None => id,
                }
            })
            .collect();

        // 4. Exclusions
        let keep: Vec<bool> = ids.iter().map(|id| !self.exclusions.contains(id)).collect();
        let ids: Vec<String> = filter_by(ids, &keep);
        stats.excluded = table.retain_rows(&keep)?;

        // 5. Roster membership
        let keep: Vec<bool> = ids.iter().map(|id| self.roster.contains(id)).collect();
        stats.unknown_ids = ids
            .iter()
            .zip(&keep)
            .filter(|&(_, &k)| !k)
            .map(|(id, _)| id.clone())
            .collect();
        let ids: Vec<String> = filter_by(ids, &keep);
        stats.not_in_roster = table.retain_rows(&keep)?;

        // 6. Canonical ids
        let canonical: Vec<Value> = ids
            .iter()
            .map(|id| {
                self.roster
                    .canonical_id(id)
                    .map(|n| Value::Number(n as f64))
                    .ok_or_else(|| {
                        Error::invariant(format!(
                            "table {}: identifier {} passed the roster filter but has no canonical id",
                            key, id
                        ))
                    })
            })
            .collect::<Result<_>>()?;
        table.set_column(spec.id_column, canonical)?;
        table.rename_column(spec.id_column, SUB_ID)?;

        // 7. Record keys
        if key == TableKey::Daily {
            let keys = composite_record_keys(&table)?;
            table.set_column(UNIQUE_ID, keys)?;
            table.move_to_front(UNIQUE_ID)?;
        }
        ensure_unique(&table, spec.record_id)?;

        // 8. Deterministic order
        sort_rows(&mut table, key, spec.sort_key)?;

        // 9. Duplicate submissions; the earliest record of a subject survives
        match spec.duplicate_policy {
            DuplicatePolicy::KeepFirst => {
                let keep = first_occurrences(&table.column_values(SUB_ID)?);
                stats.duplicates_dropped = table.retain_rows(&keep)?;
            }
            DuplicatePolicy::Reject => {
                let keep = first_occurrences(&table.column_values(SUB_ID)?);
                if let Some(row) = keep.iter().position(|k| !k) {
                    return Err(Error::invariant(format!(
                        "table {}: subject {} has more than one submission",
                        key,
                        table.get(row, SUB_ID)?.key_text()
                    )));
                }
            }
            DuplicatePolicy::FlagSameDay => {}
        }

        stats.output_rows = table.len();
        if !stats.unknown_ids.is_empty() {
            warn!(
                table = %key,
                count = stats.unknown_ids.len(),
                "Identifiers not in roster were dropped"
            );
        }
        info!(
            table = %key,
            input = stats.input_rows,
            missing_key = stats.missing_key,
            excluded = stats.excluded,
            not_in_roster = stats.not_in_roster,
            duplicates = stats.duplicates_dropped,
            output = stats.output_rows,
            "Reconciled identities"
        );
        Ok((table, stats))
    }
}

fn filter_by<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter(|&(_, &k)| k)
        .map(|(item, _)| item)
        .collect()
}

/// True for the first row of every distinct value
fn first_occurrences(values: &[Value]) -> Vec<bool> {
    let mut seen = HashSet::new();
    values.iter().map(|v| seen.insert(v.key_text())).collect()
}

/// Record keys must be present and unique
pub fn ensure_unique(table: &Table, column: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(table.len());
    for (row, value) in table.column_values(column)?.iter().enumerate() {
        if value.is_missing() {
            return Err(Error::invariant(format!(
                "table {}: row {} has no {}",
                table.name(),
                row,
                column
            )));
        }
        if !seen.insert(value.key_text()) {
            return Err(Error::invariant(format!(
                "table {}: duplicate {} {}",
                table.name(),
                column,
                value.key_text()
            )));
        }
    }
    Ok(())
}

/// Composite daily key: `record_id` plus a variant letter
///
/// `L` long survey, `S` short survey, `LA` April-18 wave, `LB` November-15
/// wave. The two daily surveys share a record id space, so the bare record id
/// is not unique.
pub fn composite_record_keys(table: &Table) -> Result<Vec<Value>> {
    let has_april = table.has_column(APRIL18_COMPLETE);
    let has_nov = table.has_column(NOV15_COMPLETE);
    let mut keys = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let record = table.get(row, "record_id")?;
        if record.is_missing() {
            return Err(Error::invariant(format!(
                "table {}: row {} has no record_id",
                table.name(),
                row
            )));
        }
        let instrument = table.get(row, "redcap_repeat_instrument")?;
        let april = has_april && !table.get(row, APRIL18_COMPLETE)?.is_missing();
        let nov = has_nov && !table.get(row, NOV15_COMPLETE)?.is_missing();

        let suffix = match (instrument.as_text(), april, nov) {
            (Some(LONG_INSTRUMENT), false, false) => "L",
            (Some(SHORT_INSTRUMENT), false, false) => "S",
            (None, true, false) if instrument.is_missing() => "LA",
            (None, false, true) if instrument.is_missing() => "LB",
            _ => {
                return Err(Error::invariant(format!(
                    "table {}: record {} has instrument '{}' with april18={} nov15={}",
                    table.name(),
                    record.key_text(),
                    instrument.key_text(),
                    april,
                    nov
                )))
            }
        };
        keys.push(Value::Text(format!("{}{}", record.key_text(), suffix)));
    }
    debug!(table = table.name(), rows = keys.len(), "Built composite record keys");
    Ok(keys)
}

/// Stable sort by `sub_id`, then the secondary key (parsed as a date for daily rows)
fn sort_rows(table: &mut Table, key: TableKey, secondary: &str) -> Result<()> {
    let subjects = table.column_values(SUB_ID)?;
    let seconds: Vec<Value> = if key == TableKey::Daily {
        (0..table.len())
            .map(|row| Ok(Value::from_option(table.timestamp(row, secondary)?)))
            .collect::<Result<_>>()?
    } else {
        table.column_values(secondary)?
    };
    table.sort_by_keys(&[subjects, seconds])
}
