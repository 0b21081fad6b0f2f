//! Categorical and range normalization
//!
//! Lookup tables are built once per run into [`Lookups`] and passed to every
//! formatter that needs them.

pub mod categorical;
pub mod range;
pub mod vocab;

pub use categorical::{Replacements, StateScope, StateTable};

use crate::loader::ReferenceData;
use std::collections::HashSet;

/// Reference vocabularies and replacement tables for one run
#[derive(Debug, Clone)]
pub struct Lookups {
    pub countries: HashSet<String>,
    pub states: StateTable,
    /// Replacement file merged with the fixed school corrections
    pub schools: Replacements,
    pub occupations: Replacements,
}

impl Lookups {
    pub fn new(reference: &ReferenceData) -> Self {
        Self {
            countries: reference.countries.iter().cloned().collect(),
            states: reference.states.clone(),
            schools: reference
                .schools
                .merged(&Replacements::from_static(vocab::SCHOOL)),
            occupations: reference.occupations.clone(),
        }
    }
}
