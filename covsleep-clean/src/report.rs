//! Run report
//!
//! Collects everything a run decided without failing: input fingerprints,
//! rows dropped per stage, implausible values blanked per column and the
//! free-text answers that could not be interpreted. Logged at the end of the
//! run and written as `run_report.json` next to the audit files.

use crate::identity::ReconcileStats;
use crate::loader::InputDigest;
use crate::sources::TableKey;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub inputs: Vec<InputDigest>,
    /// Identity reconciliation counts per table
    pub reconciliation: BTreeMap<String, ReconcileStats>,
    /// Rows removed after reconciliation, per table and step
    pub dropped: BTreeMap<String, BTreeMap<String, usize>>,
    /// Cells blanked as implausible, keyed `table.column`
    pub plausibility: BTreeMap<String, usize>,
    /// Uninterpretable answers replaced with missing, keyed `table.column`
    pub audits: BTreeMap<String, Vec<String>>,
    /// Daily rows whose reference date could not be inferred
    pub reference_date_problems: usize,
}

fn key(table: &str, column: &str) -> String {
    format!("{}.{}", table, column)
}

impl RunReport {
    pub fn new(inputs: Vec<InputDigest>) -> Self {
        Self {
            inputs,
            ..Default::default()
        }
    }

    pub fn record_reconciliation(&mut self, table: TableKey, stats: &ReconcileStats) {
        self.reconciliation.insert(table.to_string(), stats.clone());
    }

    pub fn record_drop(&mut self, table: &str, step: &str, rows: usize) {
        if rows == 0 {
            return;
        }
        info!(table, step, rows, "Dropped rows");
        *self
            .dropped
            .entry(table.to_string())
            .or_default()
            .entry(step.to_string())
            .or_default() += rows;
    }

    /// Count cells set to missing by a plausibility rule
    pub fn record_plausibility(&mut self, table: &str, column: &str, blanked: usize) {
        if blanked == 0 {
            return;
        }
        warn!(table, column, blanked, "Implausible values set to missing");
        *self.plausibility.entry(key(table, column)).or_default() += blanked;
    }

    pub fn record_audit(&mut self, table: &str, column: &str, values: Vec<String>) {
        if values.is_empty() {
            return;
        }
        warn!(table, column, count = values.len(), "Uninterpretable answers set to missing");
        self.audits
            .entry(key(table, column))
            .or_default()
            .extend(values);
    }

    pub fn record_reference_date_problems(&mut self, rows: usize) {
        self.reference_date_problems += rows;
    }

    pub fn plausibility_total(&self) -> usize {
        self.plausibility.values().sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// End-of-run summary
    pub fn log_summary(&self) {
        let dropped: usize = self.dropped.values().flat_map(|m| m.values()).sum();
        let not_in_roster: usize = self.reconciliation.values().map(|s| s.not_in_roster).sum();
        info!(
            inputs = self.inputs.len(),
            not_in_roster,
            dropped,
            plausibility = self.plausibility_total(),
            audited_columns = self.audits.len(),
            reference_date_problems = self.reference_date_problems,
            "Run summary"
        );
        for (column, count) in &self.plausibility {
            info!(column = %column, count, "Plausibility warnings");
        }
    }
}
