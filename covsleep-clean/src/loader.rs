//! Raw file loading
//!
//! Survey exports are read with the `csv` crate into [`Table`]s of raw text
//! cells. Repeated header names get pandas-style `.1`, `.2` suffixes so that
//! every column stays addressable. Every file read is fingerprinted with
//! SHA-256 for the run report.

use crate::identity::{Corrections, Roster};
use crate::normalize::{Replacements, StateTable};
use crate::sources::RawSources;
use covsleep_common::config::InputFiles;
use covsleep_common::{Error, Result, Table, Value};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Fingerprint of one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputDigest {
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Lookup files read alongside the survey exports
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub roster: Roster,
    pub corrections: Corrections,
    pub countries: Vec<String>,
    pub states: StateTable,
    pub schools: Replacements,
    pub occupations: Replacements,
}

/// Reads input files relative to the data folder and remembers their digests
#[derive(Debug)]
pub struct Loader {
    data_dir: PathBuf,
    digests: Vec<InputDigest>,
}

impl Loader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            digests: Vec::new(),
        }
    }

    /// Digests of every file read so far, in read order
    pub fn digests(&self) -> &[InputDigest] {
        &self.digests
    }

    pub fn into_digests(self) -> Vec<InputDigest> {
        self.digests
    }

    fn read_bytes(&mut self, relative: &str) -> Result<Vec<u8>> {
        let path = self.data_dir.join(relative);
        if !path.exists() {
            return Err(Error::NotFound(format!("input file {}", path.display())));
        }
        let bytes = std::fs::read(&path)?;
        let digest = hex(&Sha256::digest(&bytes));
        debug!(path = %path.display(), sha256 = %digest, "Read input file");
        self.digests.push(InputDigest {
            path: relative.to_string(),
            sha256: digest,
            bytes: bytes.len() as u64,
        });
        Ok(bytes)
    }

    /// Read a CSV export with a header row
    pub fn read_table(&mut self, relative: &str, name: &str) -> Result<Table> {
        let bytes = self.read_bytes(relative)?;
        let table = parse_table(&bytes, name)?;
        info!(
            table = name,
            rows = table.len(),
            columns = table.columns().len(),
            "Loaded export"
        );
        Ok(table)
    }

    /// Read every survey export named in the config
    pub fn load_sources(&mut self, inputs: &InputFiles) -> Result<RawSources> {
        Ok(RawSources {
            daily_long: self.read_table(&inputs.daily_long, "daily_long")?,
            daily_short: self.read_table(&inputs.daily_short, "daily_short")?,
            demographics: self.read_table(&inputs.demographics, "demo")?,
            round1: self.read_table(&inputs.round1, "r1")?,
            round2: self.read_table(&inputs.round2, "r2")?,
            round3: self.read_table(&inputs.round3, "r3")?,
            round4: self.read_table(&inputs.round4, "r4")?,
            round5: self.read_table(&inputs.round5, "r5")?,
            april18: self.read_table(&inputs.april18, "april18")?,
            round7_vaccinated: self.read_table(&inputs.round7_vaccinated, "r7_vaccinated")?,
            round7_unvaccinated: self
                .read_table(&inputs.round7_unvaccinated, "r7_unvaccinated")?,
            round8: self.read_table(&inputs.round8, "r8")?,
            nov15: self.read_table(&inputs.nov15, "nov15")?,
        })
    }

    /// Read the roster, corrections and vocabulary files
    pub fn load_reference(&mut self, inputs: &InputFiles) -> Result<ReferenceData> {
        let roster = self.load_roster(&inputs.roster)?;
        let corrections = self.load_corrections(&inputs.corrections)?;
        let countries = self.load_word_list(&inputs.countries)?;
        let states = self.load_states(&inputs.states)?;
        let schools = self.load_replacements(&inputs.schools, "ORIGINAL")?;
        let occupations = self.load_replacements(&inputs.occupations, "old")?;
        info!(
            roster = roster.len(),
            corrections = corrections.len(),
            countries = countries.len(),
            schools = schools.len(),
            occupations = occupations.len(),
            "Loaded reference data"
        );
        Ok(ReferenceData {
            roster,
            corrections,
            countries,
            states,
            schools,
            occupations,
        })
    }

    /// Headerless `identifier,canonical id` file
    pub fn load_roster(&mut self, relative: &str) -> Result<Roster> {
        let bytes = self.read_bytes(relative)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes.as_slice());
        let mut entries = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let id = record.get(0).unwrap_or("").to_string();
            let num_text = record.get(1).unwrap_or("").trim();
            let num: i64 = num_text.parse().map_err(|_| {
                Error::format(format!(
                    "roster line {}: '{}' is not an integer subject number",
                    line + 1,
                    num_text
                ))
            })?;
            entries.push((id, num));
        }
        Roster::from_entries(entries)
    }

    /// `INCORRECT,CORRECT` file
    pub fn load_corrections(&mut self, relative: &str) -> Result<Corrections> {
        let bytes = self.read_bytes(relative)?;
        let table = parse_table(&bytes, "corrections")?;
        let mut pairs = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let from = table.get(row, "INCORRECT")?.key_text();
            let to = table.get(row, "CORRECT")?.key_text();
            pairs.push((from, to));
        }
        Ok(Corrections::from_pairs(pairs))
    }

    /// Newline-separated list, trimmed and uppercased, blanks skipped
    pub fn load_word_list(&mut self, relative: &str) -> Result<Vec<String>> {
        let bytes = self.read_bytes(relative)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text
            .lines()
            .map(|l| l.trim().to_uppercase())
            .filter(|l| !l.is_empty())
            .collect())
    }

    /// `state,long,short` abbreviation table
    pub fn load_states(&mut self, relative: &str) -> Result<StateTable> {
        let bytes = self.read_bytes(relative)?;
        let table = parse_table(&bytes, "states")?;
        let mut rows = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            rows.push((
                table.get(row, "state")?.key_text(),
                table.get(row, "long")?.key_text(),
                table.get(row, "short")?.key_text(),
            ));
        }
        StateTable::from_rows(rows)
    }

    /// Two-column replacement table keyed by `key_column`
    ///
    /// The replacement is the other column; an empty replacement blanks the value.
    pub fn load_replacements(&mut self, relative: &str, key_column: &str) -> Result<Replacements> {
        let bytes = self.read_bytes(relative)?;
        let table = parse_table(&bytes, relative)?;
        let value_column = table
            .columns()
            .iter()
            .find(|c| c.as_str() != key_column)
            .cloned()
            .ok_or_else(|| {
                Error::invariant(format!("{} has no replacement column", relative))
            })?;
        let mut pairs = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let from = table.get(row, key_column)?;
            if from.is_missing() {
                continue;
            }
            let to = match table.get(row, &value_column)? {
                Value::Missing => None,
                other => Some(other.key_text()),
            };
            pairs.push((from.key_text(), to));
        }
        Ok(Replacements::new(pairs))
    }
}

/// Parse CSV bytes with a header row into a table of raw cells
pub fn parse_table(bytes: &[u8], name: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let rows = reader
        .records()
        .map(|record| Ok(record?.iter().map(Value::from_raw).collect()))
        .collect::<Result<Vec<Vec<Value>>>>()?;
    Table::from_rows(name, disambiguate_headers(headers), rows)
}

/// Suffix repeated header names with `.1`, `.2`, ... in order of appearance
pub fn disambiguate_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());
    for header in headers {
        let count = seen.entry(header.clone()).or_insert(0);
        if *count == 0 {
            out.push(header);
        } else {
            out.push(format!("{}.{}", header, count));
        }
        *count += 1;
    }
    out
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disambiguate_headers() {
        let headers = vec!["a".to_string(), "b".to_string(), "a".to_string(), "a".to_string()];
        assert_eq!(disambiguate_headers(headers), vec!["a", "b", "a.1", "a.2"]);
    }

    #[test]
    fn test_parse_table_keeps_empty_as_missing() {
        let table = parse_table(b"record_id,subjid_rd1\n1,ab12c\n2,\n", "r1").unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.get(1, "subjid_rd1").unwrap().is_missing());
    }

    #[test]
    fn test_ragged_rows_are_csv_errors() {
        let err = parse_table(b"a,b\n1,2,3\n", "bad").unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let mut loader = Loader::new(temp.path());
        let err = loader.read_table("nope.csv", "nope").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(loader.digests().is_empty());
    }

    #[test]
    fn test_digest_is_recorded() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("ids.csv"), "ab12c,17\n").unwrap();
        let mut loader = Loader::new(temp.path());
        let roster = loader.load_roster("ids.csv").unwrap();
        assert_eq!(roster.canonical_id("AB12C"), Some(17));
        let digest = &loader.digests()[0];
        assert_eq!(digest.sha256.len(), 64);
        assert_eq!(digest.bytes, 9);
    }
}
