//! Free-text canonicalization by lookup table
//!
//! Answers are first normalized lexically (trim, uppercase, strip periods),
//! then replaced through a correction table. Country, state and vaccine columns
//! must end up inside a closed vocabulary; anything else is an invariant
//! violation so that new garbage is triaged by a human.

use super::vocab::{Dict, LikertLabels, STATE_COUNTRIES};
use covsleep_common::{Error, Result, Table, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Free-text variant to canonical value; `None` blanks the answer
#[derive(Debug, Clone, Default)]
pub struct Replacements {
    map: HashMap<String, Option<String>>,
}

impl Replacements {
    /// Later pairs win over earlier ones with the same key
    pub fn new(pairs: Vec<(String, Option<String>)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    pub fn from_static(dict: Dict) -> Self {
        Self::new(
            dict.iter()
                .map(|(from, to)| {
                    let to = (!to.is_empty()).then(|| to.to_string());
                    (from.to_string(), to)
                })
                .collect(),
        )
    }

    /// Union of both tables; `other` wins on conflicts
    pub fn merged(&self, other: &Replacements) -> Replacements {
        let mut map = self.map.clone();
        map.extend(other.map.iter().map(|(k, v)| (k.clone(), v.clone())));
        Replacements { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// `None` when no replacement is known, `Some(None)` when it blanks
    pub fn lookup(&self, value: &str) -> Option<Option<&str>> {
        self.map.get(value).map(|v| v.as_deref())
    }

    /// Every non-empty replacement value
    pub fn canonical_values(&self) -> HashSet<&str> {
        self.map.values().filter_map(|v| v.as_deref()).collect()
    }
}

/// State and province names to their postal abbreviations
#[derive(Debug, Clone, Default)]
pub struct StateTable {
    abbreviations: HashMap<String, String>,
    codes: HashSet<String>,
}

impl StateTable {
    /// Rows of `(state, long name, code)`
    ///
    /// Both name columns map to the code. Keys are normalized the same way as
    /// the answers they are matched against.
    pub fn from_rows(rows: Vec<(String, String, String)>) -> Result<Self> {
        let mut abbreviations = HashMap::new();
        let mut codes = HashSet::new();
        for (state, long, short) in rows {
            let code = short.trim().to_uppercase();
            if code.is_empty() {
                return Err(Error::invariant(format!(
                    "state table row '{}' has no abbreviation",
                    state
                )));
            }
            for name in [state, long] {
                let key = state_key(&name);
                if !key.is_empty() {
                    abbreviations.insert(key, code.clone());
                }
            }
            codes.insert(code);
        }
        Ok(Self {
            abbreviations,
            codes,
        })
    }

    /// Abbreviation for a normalized state name
    pub fn abbreviate(&self, name: &str) -> Option<&str> {
        self.abbreviations.get(name).map(String::as_str)
    }

    pub fn is_code(&self, value: &str) -> bool {
        self.codes.contains(value)
    }

    pub fn codes(&self) -> &HashSet<String> {
        &self.codes
    }
}

fn state_key(raw: &str) -> String {
    raw.trim().to_uppercase().replace('.', "")
}

/// Which rows of a state column must carry a valid abbreviation
#[derive(Debug, Clone, Copy)]
pub enum StateScope<'a> {
    /// Every non-missing state
    All,
    /// Only rows whose country column is the United States or Canada
    NorthAmericaRows(&'a str),
    /// States of rows outside the United States and Canada are blanked first
    BlankOutsideNorthAmerica(&'a str),
}

fn text_cells<F>(table: &mut Table, column: &str, mut f: F) -> Result<()>
where
    F: FnMut(String) -> Value,
{
    table.map_column(column, |v| {
        Ok(match v {
            Value::Missing => Value::Missing,
            other => f(other.key_text()),
        })
    })
}

/// Trim and uppercase; answers that trim to nothing become missing
pub fn upper_trim(table: &mut Table, column: &str) -> Result<()> {
    text_cells(table, column, |s| {
        let s = s.trim().to_uppercase();
        if s.is_empty() {
            Value::Missing
        } else {
            Value::Text(s)
        }
    })
}

/// Trim only; answers that trim to nothing become missing
pub fn trim(table: &mut Table, column: &str) -> Result<()> {
    text_cells(table, column, |s| {
        let s = s.trim();
        if s.is_empty() {
            Value::Missing
        } else {
            Value::Text(s.to_string())
        }
    })
}

pub fn strip_periods(table: &mut Table, column: &str) -> Result<()> {
    text_cells(table, column, |s| Value::Text(s.replace('.', "")))
}

/// Replace known variants; returns the number of cells changed
pub fn canonicalize(table: &mut Table, column: &str, replacements: &Replacements) -> Result<usize> {
    let mut changed = 0;
    table.map_column(column, |v| {
        if v.is_missing() {
            return Ok(Value::Missing);
        }
        Ok(match replacements.lookup(&v.key_text()) {
            Some(Some(canonical)) => {
                changed += 1;
                Value::Text(canonical.to_string())
            }
            Some(None) => {
                changed += 1;
                Value::Missing
            }
            None => v.clone(),
        })
    })?;
    debug!(table = table.name(), column, changed, "Applied replacements");
    Ok(changed)
}

/// Distinct non-missing values outside a vocabulary, sorted
fn outside<F>(table: &Table, column: &str, rows: &[bool], allowed: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let values = table.column_values(column)?;
    let bad: BTreeSet<String> = values
        .iter()
        .zip(rows)
        .filter(|&(v, &checked)| checked && !v.is_missing())
        .map(|(v, _)| v.key_text())
        .filter(|s| !allowed(s))
        .collect();
    Ok(bad.into_iter().collect())
}

/// Fail unless every non-missing value is allowed
pub fn enforce_vocabulary<F>(table: &Table, column: &str, allowed: F) -> Result<()>
where
    F: Fn(&str) -> bool,
{
    let rows = vec![true; table.len()];
    enforce_on_rows(table, column, &rows, allowed)
}

fn enforce_on_rows<F>(table: &Table, column: &str, rows: &[bool], allowed: F) -> Result<()>
where
    F: Fn(&str) -> bool,
{
    let bad = outside(table, column, rows, allowed)?;
    if bad.is_empty() {
        Ok(())
    } else {
        Err(Error::invariant(format!(
            "{}.{} has values outside its vocabulary: {}",
            table.name(),
            column,
            bad.join(", ")
        )))
    }
}

/// Blank values outside a vocabulary and return them for the audit list
pub fn blank_outside_vocabulary<F>(table: &mut Table, column: &str, allowed: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let mut blanked = Vec::new();
    table.map_column(column, |v| {
        if v.is_missing() || allowed(&v.key_text()) {
            Ok(v.clone())
        } else {
            blanked.push(v.key_text());
            Ok(Value::Missing)
        }
    })?;
    if !blanked.is_empty() {
        warn!(
            table = table.name(),
            column,
            count = blanked.len(),
            values = ?blanked,
            "Replacing unrecognized answers with missing"
        );
    }
    Ok(blanked)
}

/// Uppercase, correct and check a country column against the country list
pub fn normalize_country(
    table: &mut Table,
    column: &str,
    corrections: &Replacements,
    countries: &HashSet<String>,
) -> Result<()> {
    upper_trim(table, column)?;
    canonicalize(table, column, corrections)?;
    enforce_vocabulary(table, column, |c| countries.contains(c))
}

fn in_north_america(table: &Table, country_column: &str) -> Result<Vec<bool>> {
    Ok(table
        .column_values(country_column)?
        .iter()
        .map(|c| STATE_COUNTRIES.contains(&c.key_text().as_str()))
        .collect())
}

/// Normalize a state column to postal abbreviations
///
/// Order: uppercase and strip periods, full names to codes, optional blanking
/// outside North America, then the correction table. The closed-vocabulary
/// check covers the rows selected by `scope`.
pub fn normalize_state(
    table: &mut Table,
    column: &str,
    corrections: &Replacements,
    states: &StateTable,
    scope: StateScope<'_>,
) -> Result<()> {
    upper_trim(table, column)?;
    strip_periods(table, column)?;
    table.map_column(column, |v| {
        Ok(match v {
            Value::Missing => Value::Missing,
            other => match states.abbreviate(&other.key_text()) {
                Some(code) => Value::Text(code.to_string()),
                None => other.clone(),
            },
        })
    })?;

    if let StateScope::BlankOutsideNorthAmerica(country_column) = scope {
        let keep = in_north_america(table, country_column)?;
        let mut values = table.column_values(column)?;
        for (value, &keep) in values.iter_mut().zip(&keep) {
            if !keep {
                *value = Value::Missing;
            }
        }
        table.set_column(column, values)?;
    }

    canonicalize(table, column, corrections)?;

    let rows = match scope {
        StateScope::NorthAmericaRows(country_column) => in_north_america(table, country_column)?,
        _ => vec![true; table.len()],
    };
    enforce_on_rows(table, column, &rows, |s| states.is_code(s))
}

/// Uppercase, correct and check a vaccine-brand column
pub fn normalize_vaccine(
    table: &mut Table,
    column: &str,
    corrections: &Replacements,
    brands: &[&str],
) -> Result<()> {
    upper_trim(table, column)?;
    canonicalize(table, column, corrections)?;
    enforce_vocabulary(table, column, |b| brands.contains(&b))
}

/// Replace Likert text labels with their numeric codes
///
/// Label sets are closed: an unknown label is an invariant violation.
pub fn likert_to_codes(table: &mut Table, column: &str, labels: &LikertLabels) -> Result<()> {
    let name = table.name().to_string();
    table.map_column(column, |v| match v {
        Value::Missing => Ok(Value::Missing),
        other => {
            let text = other.key_text();
            labels.code(text.trim()).map(Value::Number).ok_or_else(|| {
                Error::invariant(format!(
                    "{}.{}: '{}' is not a {} label",
                    name, column, text, labels.name
                ))
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::vocab::{AGREEMENT, R8_VACCINE, VACCINE_BRANDS_R8};

    fn table(column: &str, values: &[&str]) -> Table {
        let mut rows = Vec::new();
        for v in values {
            rows.push(vec![Value::from_raw(v)]);
        }
        Table::from_rows("t", vec![column.to_string()], rows).unwrap()
    }

    fn states() -> StateTable {
        StateTable::from_rows(vec![
            ("Massachusetts".into(), "MASSACHUSETTS".into(), "MA".into()),
            ("Ontario".into(), "ONTARIO".into(), "ON".into()),
            ("New York".into(), "NEW YORK".into(), "NY".into()),
        ])
        .unwrap()
    }

    #[test]
    fn test_replacements_merge_prefers_other() {
        let file = Replacements::new(vec![("a".into(), Some("x".into())), ("b".into(), None)]);
        let fixed = Replacements::new(vec![("a".into(), Some("y".into()))]);
        let merged = file.merged(&fixed);
        assert_eq!(merged.lookup("a"), Some(Some("y")));
        assert_eq!(merged.lookup("b"), Some(None));
        assert_eq!(merged.lookup("c"), None);
        assert!(merged.canonical_values().contains("y"));
    }

    #[test]
    fn test_country_normalization() {
        let mut t = table("country", &[" usa ", "Canada", ""]);
        let corrections = Replacements::new(vec![("USA".into(), Some("UNITED STATES".into()))]);
        let countries: HashSet<String> =
            ["UNITED STATES", "CANADA"].iter().map(|s| s.to_string()).collect();
        normalize_country(&mut t, "country", &corrections, &countries).unwrap();
        assert_eq!(t.get(0, "country").unwrap().key_text(), "UNITED STATES");
        assert_eq!(t.get(1, "country").unwrap().key_text(), "CANADA");
        assert!(t.get(2, "country").unwrap().is_missing());
    }

    #[test]
    fn test_unknown_country_is_fatal() {
        let mut t = table("country", &["Atlantis"]);
        let countries: HashSet<String> = ["CANADA".to_string()].into_iter().collect();
        let err = normalize_country(&mut t, "country", &Replacements::default(), &countries)
            .unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }

    #[test]
    fn test_state_full_name_and_periods() {
        let mut t = table("state", &["Massachusetts", "N.Y.", "ontario"]);
        normalize_state(&mut t, "state", &Replacements::default(), &states(), StateScope::All)
            .unwrap();
        let values: Vec<String> = t.column_values("state").unwrap().iter().map(|v| v.key_text()).collect();
        assert_eq!(values, vec!["MA", "NY", "ON"]);
    }

    #[test]
    fn test_state_blanked_outside_north_america() {
        let mut t = Table::from_rows(
            "r3",
            vec!["country_3mo".into(), "state_3mo".into()],
            vec![
                vec!["UNITED KINGDOM".into(), "Yorkshire".into()],
                vec!["UNITED STATES".into(), "boston".into()],
            ],
        )
        .unwrap();
        let corrections = Replacements::new(vec![("BOSTON".into(), Some("MA".into()))]);
        normalize_state(
            &mut t,
            "state_3mo",
            &corrections,
            &states(),
            StateScope::BlankOutsideNorthAmerica("country_3mo"),
        )
        .unwrap();
        assert!(t.get(0, "state_3mo").unwrap().is_missing());
        assert_eq!(t.get(1, "state_3mo").unwrap().key_text(), "MA");
    }

    #[test]
    fn test_state_checked_only_for_north_america_rows() {
        let mut t = Table::from_rows(
            "demo",
            vec!["country".into(), "state".into()],
            vec![
                vec!["GERMANY".into(), "Bavaria".into()],
                vec!["CANADA".into(), "Atlantis".into()],
            ],
        )
        .unwrap();
        let err = normalize_state(
            &mut t,
            "state",
            &Replacements::default(),
            &states(),
            StateScope::NorthAmericaRows("country"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("ATLANTIS"));
        assert!(!err.to_string().contains("BAVARIA"));
    }

    #[test]
    fn test_vaccine_normalization() {
        let mut t = table("vacc_type", &["pfizer/biontech", "J&J, Pfizer", "4/8/21", ""]);
        let corrections = Replacements::from_static(R8_VACCINE);
        normalize_vaccine(&mut t, "vacc_type", &corrections, VACCINE_BRANDS_R8).unwrap();
        assert_eq!(t.get(0, "vacc_type").unwrap().key_text(), "PFIZER");
        assert_eq!(t.get(1, "vacc_type").unwrap().key_text(), "MIXED");
        assert!(t.get(2, "vacc_type").unwrap().is_missing());
    }

    #[test]
    fn test_blank_outside_vocabulary_reports_values() {
        let mut t = table("school", &["High School", "my backyard"]);
        let blanked = blank_outside_vocabulary(&mut t, "school", |s| s == "High School").unwrap();
        assert_eq!(blanked, vec!["my backyard"]);
        assert!(t.get(1, "school").unwrap().is_missing());
    }

    #[test]
    fn test_likert_labels() {
        let mut t = table("SilverLinings_1", &["Agree", "", "Strongly agree"]);
        likert_to_codes(&mut t, "SilverLinings_1", &AGREEMENT).unwrap();
        assert_eq!(t.number(0, "SilverLinings_1").unwrap(), Some(4.0));
        assert_eq!(t.number(1, "SilverLinings_1").unwrap(), None);

        let mut bad = table("SilverLinings_1", &["Meh"]);
        assert!(likert_to_codes(&mut bad, "SilverLinings_1", &AGREEMENT).is_err());
    }
}
