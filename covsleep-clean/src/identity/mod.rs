//! Identity reconciliation
//!
//! Respondents typed their study identifier by hand into every instrument.
//! This module turns those strings into canonical integer subject ids:
//! normalize, correct known typos, drop exclusions and unknown identifiers,
//! map through the roster, and settle duplicate submissions.

pub mod reconciler;
pub mod roster;

pub use reconciler::{ReconcileStats, Reconciler};
pub use roster::{Corrections, Roster};

use covsleep_common::{Error, Result, Table, Value};
use tracing::info;

/// Zero-width space pasted in with some identifiers
const ZERO_WIDTH_SPACE: char = '\u{200b}';

/// Trim, uppercase and remove zero-width spaces
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .chars()
        .filter(|&c| c != ZERO_WIDTH_SPACE)
        .collect()
}

/// Copy columns from the rows of a split submission onto the real subject
///
/// One participant finished part of a wave under a second identifier
/// (`donor`). The donor's answers in `columns` are copied onto every row of
/// `recipient`, and the donor rows are removed. Identifiers are compared after
/// normalization. Returns the number of recipient rows updated.
pub fn transplant_responses(
    table: &mut Table,
    id_column: &str,
    donor: &str,
    recipient: &str,
    columns: &[String],
) -> Result<usize> {
    let ids: Vec<String> = table
        .column_values(id_column)?
        .iter()
        .map(|v| normalize_identifier(&v.key_text()))
        .collect();

    let donor_rows: Vec<usize> = ids
        .iter()
        .enumerate()
        .filter(|(_, id)| id.as_str() == donor)
        .map(|(i, _)| i)
        .collect();
    if donor_rows.len() > 1 {
        return Err(Error::invariant(format!(
            "table {}: {} rows for split identifier {}",
            table.name(),
            donor_rows.len(),
            donor
        )));
    }
    let Some(&donor_row) = donor_rows.first() else {
        return Ok(0);
    };

    let answers: Vec<(String, Value)> = columns
        .iter()
        .map(|c| Ok((c.clone(), table.get(donor_row, c)?)))
        .collect::<Result<_>>()?;

    let mut updated = 0;
    for (row, id) in ids.iter().enumerate() {
        if id.as_str() == recipient {
            for (column, value) in &answers {
                table.set(row, column, value.clone())?;
            }
            updated += 1;
        }
    }

    let mask: Vec<bool> = ids.iter().map(|id| id.as_str() != donor).collect();
    table.retain_rows(&mask)?;
    info!(
        table = table.name(),
        donor, recipient, updated, "Merged split submission"
    );
    Ok(updated)
}

/// Remove every row carrying an identifier; returns the count removed
pub fn drop_identifier(table: &mut Table, id_column: &str, id: &str) -> Result<usize> {
    let mask: Vec<bool> = table
        .column_values(id_column)?
        .iter()
        .map(|v| normalize_identifier(&v.key_text()) != id)
        .collect();
    table.retain_rows(&mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  ab12c\u{200b} "), "AB12C");
        assert_eq!(normalize_identifier("\u{200b}"), "");
    }

    #[test]
    fn test_transplant_responses() {
        let mut table = Table::from_rows(
            "r6",
            vec!["subjid_2".into(), "party_fear".into(), "other".into()],
            vec![
                vec!["wska2".into(), Value::Missing, "x".into()],
                vec!["WSKA2_LSAS".into(), Value::Number(2.0), "y".into()],
                vec!["ZZ99Z".into(), Value::Number(1.0), "z".into()],
            ],
        )
        .unwrap();
        let updated = transplant_responses(
            &mut table,
            "subjid_2",
            "WSKA2_LSAS",
            "WSKA2",
            &["party_fear".to_string()],
        )
        .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.number(0, "party_fear").unwrap(), Some(2.0));
        assert_eq!(table.get(0, "other").unwrap().key_text(), "x");
    }

    #[test]
    fn test_transplant_without_donor_is_noop() {
        let mut table = Table::from_rows(
            "r6",
            vec!["subjid_2".into(), "party_fear".into()],
            vec![vec!["WSKA2".into(), Value::Number(1.0)]],
        )
        .unwrap();
        let updated =
            transplant_responses(&mut table, "subjid_2", "WSKA2_LSAS", "WSKA2", &[]).unwrap();
        assert_eq!(updated, 0);
        assert_eq!(table.len(), 1);
    }
}
