//! Roster and identifier-correction tables
//!
//! Both are built once per run from their files and are immutable afterwards.

use super::normalize_identifier;
use covsleep_common::{Error, Result};
use std::collections::HashMap;

/// Eligible identifiers and their canonical subject numbers
///
/// The mapping is a bijection: duplicate identifiers or duplicate numbers are
/// rejected when the roster is built.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    ids: HashMap<String, i64>,
}

impl Roster {
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let mut ids = HashMap::new();
        let mut numbers: HashMap<i64, String> = HashMap::new();
        for (raw, number) in entries {
            let id = normalize_identifier(&raw);
            if id.is_empty() {
                return Err(Error::invariant("roster contains an empty identifier"));
            }
            if let Some(other) = numbers.insert(number, id.clone()) {
                return Err(Error::invariant(format!(
                    "roster assigns subject number {} to both {} and {}",
                    number, other, id
                )));
            }
            if ids.insert(id.clone(), number).is_some() {
                return Err(Error::invariant(format!(
                    "roster lists identifier {} more than once",
                    id
                )));
            }
        }
        Ok(Self { ids })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Canonical number for an already normalized identifier
    pub fn canonical_id(&self, id: &str) -> Option<i64> {
        self.ids.get(id).copied()
    }
}

/// Known typos in typed identifiers, applied to every table
#[derive(Debug, Clone, Default)]
pub struct Corrections {
    map: HashMap<String, String>,
}

impl Corrections {
    /// Both sides are normalized the same way as the identifiers they fix
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let map = pairs
            .into_iter()
            .map(|(from, to)| (normalize_identifier(&from), normalize_identifier(&to)))
            .filter(|(from, _)| !from.is_empty())
            .collect();
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Corrected identifier, or `None` when no correction applies
    pub fn correct(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_normalizes_ids() {
        let roster = Roster::from_entries(vec![(" ab12c ".to_string(), 3)]).unwrap();
        assert_eq!(roster.canonical_id("AB12C"), Some(3));
        assert!(!roster.contains("ab12c"));
    }

    #[test]
    fn test_roster_rejects_duplicate_identifier() {
        let err = Roster::from_entries(vec![("AB12C".to_string(), 1), ("ab12c".to_string(), 2)])
            .unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }

    #[test]
    fn test_roster_rejects_duplicate_number() {
        let err = Roster::from_entries(vec![("AB12C".to_string(), 1), ("ZZ99Z".to_string(), 1)])
            .unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }

    #[test]
    fn test_corrections_normalize_both_sides() {
        let c = Corrections::from_pairs(vec![(" a1b2c3".to_string(), "a1b2c4 ".to_string())]);
        assert_eq!(c.correct("A1B2C3"), Some("A1B2C4"));
        assert_eq!(c.correct("A1B2C4"), None);
    }
}
