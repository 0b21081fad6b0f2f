//! CSV export
//!
//! Each table is written twice per stage: in full and de-identified. Clock
//! cells render as `HH:MM`, timestamp columns whose values all fall on
//! midnight render as dates, and missing cells are empty.

use crate::report::RunReport;
use crate::sources::TableKey;
use covsleep_common::config::OutputConfig;
use covsleep_common::table::format_number;
use covsleep_common::time::is_midnight;
use covsleep_common::{Error, Result, Table, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const STAMP_FORMAT: &str = "%Y-%m-%d_%H_%M";
const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Straight after identity reconciliation
    Raw,
    /// After formatting, scoring and validation
    Cleaned,
}

impl Stage {
    fn label(&self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Cleaned => "cleaned",
        }
    }
}

/// Current local time as an export stamp
pub fn stamp_now() -> String {
    chrono::Local::now().format(STAMP_FORMAT).to_string()
}

/// `COVID19_<label>_<stage>[_deid]_<stamp>.csv`
pub fn export_file_name(key: TableKey, stage: Stage, deidentified: bool, stamp: &str) -> String {
    format!(
        "COVID19_{}_{}{}_{}.csv",
        key.export_label(),
        stage.label(),
        if deidentified { "_deid" } else { "" },
        stamp
    )
}

/// Writes exports and audit files below the data folder
#[derive(Debug, Clone)]
pub struct Exporter {
    export_dir: PathBuf,
    check_dir: PathBuf,
    stamp: String,
}

impl Exporter {
    pub fn new(data_dir: &Path, output: &OutputConfig) -> Self {
        Self {
            export_dir: data_dir.join(&output.export_dir),
            check_dir: data_dir.join(&output.check_dir),
            stamp: output.stamp.clone().unwrap_or_else(stamp_now),
        }
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn check_dir(&self) -> &Path {
        &self.check_dir
    }

    /// Full and de-identified files of every table
    pub fn write_stage(&self, stage: Stage, tables: &[(TableKey, Table)]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.export_dir)?;
        let mut written = Vec::with_capacity(tables.len() * 2);
        for (key, table) in tables {
            let full = self
                .export_dir
                .join(export_file_name(*key, stage, false, &self.stamp));
            write_csv(&full, table)?;
            written.push(full);

            let deid = self
                .export_dir
                .join(export_file_name(*key, stage, true, &self.stamp));
            write_csv(&deid, &deidentify(*key, table)?)?;
            written.push(deid);
        }
        info!(
            stage = stage.label(),
            files = written.len(),
            dir = %self.export_dir.display(),
            "Exported tables"
        );
        Ok(written)
    }

    /// Identifiers that matched neither the roster nor a correction
    pub fn write_problem_ids(&self, key: TableKey, ids: &[String]) -> Result<PathBuf> {
        let path = self
            .check_dir
            .join(format!("{}_problem_sub_ids.csv", key.check_label()));
        fs::create_dir_all(&self.check_dir)?;
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["sub_id"])?;
        for id in ids {
            writer.write_record([id])?;
        }
        writer.flush()?;
        debug!(table = %key, ids = ids.len(), "Wrote problem identifiers");
        Ok(path)
    }

    /// An audit table in the check folder
    pub fn write_check(&self, file_name: &str, table: &Table) -> Result<PathBuf> {
        fs::create_dir_all(&self.check_dir)?;
        let path = self.check_dir.join(file_name);
        write_csv(&path, table)?;
        Ok(path)
    }

    pub fn write_report(&self, report: &RunReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.check_dir)?;
        let path = self.check_dir.join("run_report.json");
        let json = report
            .to_json()
            .map_err(|e| Error::format(format!("run report: {}", e)))?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

/// Copy of a table without its free-text and contact columns
pub fn deidentify(key: TableKey, table: &Table) -> Result<Table> {
    let drop = key.spec().deid_columns;
    let keep: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| !drop.contains(&c.as_str()))
        .cloned()
        .collect();
    table.select_columns(table.name(), &keep)
}

/// Render and write one table
pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns())?;
    for row in render(table)? {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = table.len(), "Wrote CSV");
    Ok(())
}

/// Every cell as its export text, row by row
pub fn render(table: &Table) -> Result<Vec<Vec<String>>> {
    let mut rows = vec![Vec::with_capacity(table.columns().len()); table.len()];
    for column in table.columns() {
        let values = table.column_values(&column)?;
        let date_only = is_date_column(&values);
        for (row, value) in rows.iter_mut().zip(&values) {
            row.push(render_cell(value, date_only));
        }
    }
    Ok(rows)
}

fn is_date_column(values: &[Value]) -> bool {
    let mut any = false;
    for value in values {
        match value {
            Value::Timestamp(ts) if is_midnight(ts) => any = true,
            Value::Timestamp(_) => return false,
            _ => {}
        }
    }
    any
}

pub fn render_cell(value: &Value, date_only: bool) -> String {
    match value {
        Value::Missing => String::new(),
        Value::Text(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::Clock(c) => c.to_string(),
        Value::Timestamp(ts) if date_only => ts.format(DATE_FORMAT).to_string(),
        Value::Timestamp(ts) => ts.format(DATETIME_FORMAT).to_string(),
    }
}
