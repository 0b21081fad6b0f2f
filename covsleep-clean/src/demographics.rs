//! Demographics formatting
//!
//! Free-text country, state, school and occupation answers are mapped to
//! closed vocabularies; numeric answers get plausibility rules.

use crate::normalize::categorical::{
    blank_outside_vocabulary, canonicalize, enforce_vocabulary, normalize_state, trim, upper_trim,
};
use crate::normalize::range::{blank_above, coerce_numeric_lenient, parse_timestamps};
use crate::normalize::vocab::{DEMO_COUNTRY, DEMO_COUNTRY_OVERRIDES, DEMO_STATE, NO_CHILDREN};
use crate::normalize::{Lookups, Replacements, StateScope};
use crate::report::RunReport;
use covsleep_common::{Error, Result, Table, Value};
use tracing::{debug, info};

const TABLE: &str = "demo";
const RECORD_ID: &str = "record_id";
const MAX_AGE: f64 = 118.0;
/// Household counts above this abort the run
const MAX_HOUSEHOLD: f64 = 20.0;

pub fn format_demographics(table: &mut Table, lookups: &Lookups, report: &mut RunReport) -> Result<()> {
    parse_timestamps(table, "date_time")?;

    let fixes: Vec<(&str, f64)> = NO_CHILDREN.iter().map(|s| (*s, 0.0)).collect();
    let rejected = coerce_numeric_lenient(table, "dependent_children", &fixes)?;
    report.record_audit(TABLE, "dependent_children", rejected);

    normalize_country(table, lookups)?;
    normalize_state(
        table,
        "state",
        &Replacements::from_static(DEMO_STATE),
        &lookups.states,
        StateScope::NorthAmericaRows("country"),
    )?;

    trim(table, "school")?;
    canonicalize(table, "school", &lookups.schools)?;
    let canonical = lookups.schools.canonical_values();
    let blanked = blank_outside_vocabulary(table, "school", |s| canonical.contains(s))?;
    report.record_audit(TABLE, "school", blanked);

    canonicalize(table, "occupation", &lookups.occupations)?;

    let blanked = blank_above(table, "age1", MAX_AGE)?;
    report.record_plausibility(TABLE, "age1", blanked);
    for column in ["dependents", "housing", "dependent_children"] {
        ensure_at_most(table, column, MAX_HOUSEHOLD)?;
    }

    info!(rows = table.len(), "Formatted demographics");
    Ok(())
}

/// Country corrections, then per-record overrides, then the closed list
fn normalize_country(table: &mut Table, lookups: &Lookups) -> Result<()> {
    upper_trim(table, "country")?;
    canonicalize(table, "country", &Replacements::from_static(DEMO_COUNTRY))?;
    let records = table.column_values(RECORD_ID)?;
    for (row, record) in records.iter().enumerate() {
        let record = record.key_text();
        if let Some((_, country)) = DEMO_COUNTRY_OVERRIDES.iter().find(|(id, _)| *id == record) {
            debug!(record = %record, country, "Country override");
            table.set(row, "country", Value::from(*country))?;
        }
    }
    enforce_vocabulary(table, "country", |c| lookups.countries.contains(c))
}

fn ensure_at_most(table: &Table, column: &str, max: f64) -> Result<()> {
    for (row, value) in table.numbers(column)?.iter().enumerate() {
        if value.is_some_and(|n| n > max) {
            return Err(Error::invariant(format!(
                "{}.{} row {}: {} exceeds {}",
                table.name(),
                column,
                row,
                value.unwrap_or_default(),
                max
            )));
        }
    }
    Ok(())
}

/// Typical time since a normal routine, converted to days
///
/// Units: 1 days, 2 weeks, 3 months (30.5 days). Other units are missing.
pub fn derive_normal_days(table: &mut Table) -> Result<()> {
    let amounts = table.numbers("normal")?;
    let units = table.numbers("normal_units")?;
    let days = amounts
        .iter()
        .zip(&units)
        .map(|(amount, unit)| {
            let factor = match unit {
                Some(u) if *u == 1.0 => Some(1.0),
                Some(u) if *u == 2.0 => Some(7.0),
                Some(u) if *u == 3.0 => Some(30.5),
                _ => None,
            };
            Value::from_option(amount.zip(factor).map(|(a, f)| a * f))
        })
        .collect();
    table.set_column("normal_days", days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::StateTable;
    use std::collections::HashSet;

    const COLUMNS: [&str; 11] = [
        RECORD_ID,
        "date_time",
        "dependent_children",
        "country",
        "state",
        "school",
        "occupation",
        "age1",
        "dependents",
        "housing",
        "normal",
    ];

    fn demo(rows: &[[&str; 11]]) -> Table {
        Table::from_rows(
            TABLE,
            COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Value::from_raw(v)).collect())
                .collect(),
        )
        .unwrap()
    }

    fn lookups() -> Lookups {
        Lookups {
            countries: ["UNITED STATES", "CANADA", "GERMANY"]
                .iter()
                .map(|s| s.to_string())
                .collect::<HashSet<_>>(),
            states: StateTable::from_rows(vec![
                ("Massachusetts".into(), "MASSACHUSETTS".into(), "MA".into()),
                ("Ontario".into(), "ONTARIO".into(), "ON".into()),
            ])
            .unwrap(),
            schools: Replacements::new(vec![(
                "college".into(),
                Some("Some college".into()),
            )]),
            occupations: Replacements::new(vec![("nurse".into(), Some("Healthcare".into()))]),
        }
    }

    #[test]
    fn test_formats_free_text() {
        let mut t = demo(&[
            ["1563", "2020-04-01 10:00", "none", "England", "", "college", "nurse", "130", "2", "3", "1"],
            ["12", "2020-04-02 11:00", "2", "germany", "Bavaria", "my backyard", "", "40", "", "", ""],
            ["13", "2020-04-03 12:00", "two", " canada ", "Ontario", "", "", "33", "", "", ""],
        ]);
        let mut report = RunReport::default();
        format_demographics(&mut t, &lookups(), &mut report).unwrap();
        assert_eq!(t.get(0, "country").unwrap().key_text(), "UNITED STATES");
        assert_eq!(t.get(1, "country").unwrap().key_text(), "GERMANY");
        assert_eq!(t.get(2, "state").unwrap().key_text(), "ON");
        assert_eq!(t.number(0, "dependent_children").unwrap(), Some(0.0));
        assert_eq!(t.number(2, "dependent_children").unwrap(), None);
        assert_eq!(t.get(0, "school").unwrap().key_text(), "Some college");
        assert!(t.get(1, "school").unwrap().is_missing());
        assert_eq!(t.get(0, "occupation").unwrap().key_text(), "Healthcare");
        assert_eq!(t.number(0, "age1").unwrap(), None);
        assert_eq!(report.audits["demo.dependent_children"], vec!["two"]);
        assert_eq!(report.audits["demo.school"], vec!["my backyard"]);
        assert_eq!(report.plausibility["demo.age1"], 1);
    }

    #[test]
    fn test_household_above_limit_is_fatal() {
        let mut t = demo(&[[
            "12", "2020-04-02 11:00", "0", "GERMANY", "", "", "", "40", "21", "", "",
        ]]);
        let err = format_demographics(&mut t, &lookups(), &mut RunReport::default()).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }

    #[test]
    fn test_normal_days() {
        let mut t = Table::from_rows(
            TABLE,
            vec!["normal".into(), "normal_units".into()],
            vec![
                vec!["3".into(), "1".into()],
                vec!["2".into(), "2".into()],
                vec!["2".into(), "3".into()],
                vec!["2".into(), Value::Missing],
            ],
        )
        .unwrap();
        derive_normal_days(&mut t).unwrap();
        assert_eq!(
            t.numbers("normal_days").unwrap(),
            vec![Some(3.0), Some(14.0), Some(61.0), None]
        );
    }
}
