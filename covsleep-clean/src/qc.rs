//! Validation of cleaned tables
//!
//! Checked after scoring and before the cleaned export. Every violation is an
//! [`Error::Invariant`]: a table that fails here is never written.

use crate::identity::reconciler::ensure_unique;
use crate::scoring::{mctq_layouts, psqi_layouts};
use crate::sources::{TableKey, SUB_ID};
use covsleep_common::{Error, Result, Table};
use tracing::{debug, info};

const PSQI_CODES: &[f64] = &[0.0, 1.0, 2.0, 3.0];
const PSQI_COMPONENTS: [&str; 7] = [
    "PSQIDURAT",
    "PSQIDISTB",
    "PSQILATEN",
    "PSQIDAYDYS",
    "PSQIHSE",
    "PSQISLPQUAL",
    "PSQIMEDS",
];

/// Columns a cleaned table is checked against, by rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contract {
    pub flags: Vec<String>,
    pub durations: Vec<String>,
    pub efficiencies: Vec<String>,
    pub code_sets: Vec<(String, &'static [f64])>,
}

impl Contract {
    pub fn for_table(key: TableKey) -> Self {
        let mut contract = Contract::default();
        if key == TableKey::Daily {
            contract.flags = strings(&["TIB_12", "TST_12", "exercise"]);
            contract.durations = strings(&["TIB", "TST", "sleepattempt"]);
            contract.efficiencies = strings(&["SE"]);
            for n in 1..=8 {
                contract.code_sets.push((format!("depression{}", n), PSQI_CODES));
            }
        }
        for layout in psqi_layouts(key) {
            contract.flags.push(layout.tib_flag());
            contract.durations.push(layout.tib());
            contract.efficiencies.push(layout.efficiency());
            for item in layout.coded_items() {
                contract.code_sets.push((item, PSQI_CODES));
            }
            for component in PSQI_COMPONENTS {
                contract.code_sets.push((layout.output(component), PSQI_CODES));
            }
        }
        for layout in mctq_layouts(key) {
            contract.flags.push(layout.output("workday_sleepduration_12"));
            contract.flags.push(layout.output("freeday_sleepduration_12"));
            for name in ["workday_sleepduration", "freeday_sleepduration", "avg_wk_sleepduration"] {
                contract.durations.push(layout.output(name));
            }
        }
        contract
    }

    pub fn column_count(&self) -> usize {
        self.flags.len() + self.durations.len() + self.efficiencies.len() + self.code_sets.len()
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Check one cleaned table; optionally log its missing-value counts
pub fn validate(key: TableKey, table: &Table, report_missing: bool) -> Result<()> {
    ensure_unique(table, key.spec().record_id)?;
    if table.has_column(SUB_ID) {
        for (row, value) in table.column_values(SUB_ID)?.iter().enumerate() {
            if value.is_missing() {
                return Err(Error::invariant(format!(
                    "table {}: row {} has no {}",
                    table.name(),
                    row,
                    SUB_ID
                )));
            }
        }
    } else {
        return Err(Error::invariant(format!("table {} has no {} column", table.name(), SUB_ID)));
    }

    let contract = Contract::for_table(key);
    for column in &contract.flags {
        check(table, column, "flag", |v| v == 0.0 || v == 1.0)?;
    }
    for column in &contract.durations {
        check(table, column, "duration", |v| (0.0..=24.0).contains(&v))?;
    }
    for column in &contract.efficiencies {
        check(table, column, "efficiency", |v| (0.0..=1.0).contains(&v))?;
    }
    for (column, codes) in &contract.code_sets {
        check(table, column, "code", |v| codes.contains(&v))?;
    }
    debug!(table = table.name(), columns = contract.column_count(), "Contract checked");

    if report_missing {
        for (column, missing) in table.missing_counts() {
            if missing > 0 {
                info!(table = table.name(), column = %column, missing, "Missing values");
            }
        }
    }
    Ok(())
}

fn check(table: &Table, column: &str, rule: &str, ok: impl Fn(f64) -> bool) -> Result<()> {
    for (row, value) in table.numbers(column)?.iter().enumerate() {
        if let Some(v) = value {
            if !ok(*v) {
                return Err(Error::invariant(format!(
                    "{}.{} row {}: {} value {} out of range",
                    table.name(),
                    column,
                    row,
                    rule,
                    v
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use covsleep_common::Value;

    fn daily(rows: Vec<Vec<Value>>) -> Table {
        let mut columns = strings(&[
            "unique_id", SUB_ID, "TIB_12", "TST_12", "exercise", "TIB", "TST", "sleepattempt", "SE",
        ]);
        columns.extend((1..=8).map(|n| format!("depression{}", n)));
        Table::from_rows("daily", columns, rows).unwrap()
    }

    fn row(id: &str, sub: &str, tib: f64, se: f64, depression: f64) -> Vec<Value> {
        let mut row: Vec<Value> = vec![
            id.into(),
            Value::from_raw(sub),
            0.0.into(),
            1.0.into(),
            Value::Missing,
            tib.into(),
            7.0.into(),
            7.5.into(),
            se.into(),
        ];
        row.extend(std::iter::repeat(Value::from(depression)).take(8));
        row
    }

    #[test]
    fn test_clean_table_passes() {
        let t = daily(vec![row("1L", "17", 8.0, 0.875, 2.0), row("1S", "17", 9.0, 0.8, 0.0)]);
        validate(TableKey::Daily, &t, true).unwrap();
    }

    #[test]
    fn test_duplicate_key_fails() {
        let t = daily(vec![row("1L", "17", 8.0, 0.9, 0.0), row("1L", "18", 8.0, 0.9, 0.0)]);
        let err = validate(TableKey::Daily, &t, false).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }

    #[test]
    fn test_missing_sub_id_fails() {
        let t = daily(vec![row("1L", "", 8.0, 0.9, 0.0)]);
        assert!(validate(TableKey::Daily, &t, false).is_err());
    }

    #[test]
    fn test_out_of_range_values_fail() {
        let long = daily(vec![row("1L", "17", 25.0, 0.9, 0.0)]);
        assert!(validate(TableKey::Daily, &long, false).is_err());
        let efficient = daily(vec![row("1L", "17", 8.0, 1.2, 0.0)]);
        assert!(validate(TableKey::Daily, &efficient, false).is_err());
        let coded = daily(vec![row("1L", "17", 8.0, 0.9, 4.0)]);
        assert!(validate(TableKey::Daily, &coded, false).is_err());
    }

    #[test]
    fn test_contract_columns_follow_layouts() {
        let contract = Contract::for_table(TableKey::Round4);
        assert!(contract.flags.contains(&"fall_PSQI_TIB_12".to_string()));
        assert!(contract.durations.contains(&"fall_mtq_avg_wk_sleepduration".to_string()));
        assert!(contract.efficiencies.contains(&"fall_PSQI_sleep_eff".to_string()));
        assert_eq!(Contract::for_table(TableKey::Round2).column_count(), 0);
    }
}
