//! Pipeline driver
//!
//! One run, in fixed order: load, assemble, reconcile identities, export the
//! raw stage, format, score, validate, export the cleaned stage and the audit
//! files. Any error aborts the run before the stage that would have used it.

use crate::daily::{format_daily, DailyAudits};
use crate::demographics::{derive_normal_days, format_demographics};
use crate::export::{Exporter, Stage};
use crate::identity::{drop_identifier, transplant_responses, Reconciler};
use crate::loader::Loader;
use crate::normalize::Lookups;
use crate::qc;
use crate::report::RunReport;
use crate::rounds::{format_wave, pre_raw_corrections};
use crate::scoring::score_table;
use crate::sources::{assemble, TableKey};
use covsleep_common::config::PipelineConfig;
use covsleep_common::{Result, Table};
use std::path::{Path, PathBuf};
use tracing::info;

/// Round-6 identifier under which one subject finished the LSAS items
const SPLIT_DONOR: &str = "WSKA2_LSAS";
const SPLIT_RECIPIENT: &str = "WSKA2";

/// Reconciled tables ready for the raw export
#[derive(Debug)]
pub struct Prepared {
    pub tables: Vec<(TableKey, Table)>,
    pub lookups: Lookups,
    pub report: RunReport,
    /// Identifiers outside the roster, per table
    pub unknown_ids: Vec<(TableKey, Vec<String>)>,
}

/// Formatted, scored and validated tables
#[derive(Debug)]
pub struct Cleaned {
    pub tables: Vec<(TableKey, Table)>,
    pub daily_audits: Option<DailyAudits>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub tables: Vec<(TableKey, Table)>,
    pub report: RunReport,
    /// Every file written, exports first
    pub written: Vec<PathBuf>,
}

pub struct Pipeline {
    config: PipelineConfig,
    data_dir: PathBuf,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load every input and reconcile identities
    pub fn prepare(&self) -> Result<Prepared> {
        info!(data_dir = %self.data_dir.display(), "Loading inputs");
        let mut loader = Loader::new(&self.data_dir);
        let reference = loader.load_reference(&self.config.inputs)?;
        let raw = loader.load_sources(&self.config.inputs)?;
        let mut report = RunReport::new(loader.into_digests());

        let mut tables = assemble(raw)?;
        merge_split_submission(&mut tables)?;

        let reconciler = Reconciler::new(
            &reference.roster,
            &reference.corrections,
            &self.config.identity.exclusions,
        );
        let mut prepared = Vec::with_capacity(tables.len());
        let mut unknown_ids = Vec::new();
        for (key, mut table, stats) in reconciler.reconcile_all(tables)? {
            report.record_reconciliation(key, &stats);
            if !stats.unknown_ids.is_empty() {
                unknown_ids.push((key, stats.unknown_ids.clone()));
            }
            pre_raw_corrections(key, &mut table)?;
            prepared.push((key, table));
        }

        Ok(Prepared {
            tables: prepared,
            lookups: Lookups::new(&reference),
            report,
            unknown_ids,
        })
    }

    /// The whole run; nothing is written when output is disabled
    pub fn run(&self) -> Result<RunOutcome> {
        let Prepared {
            tables,
            lookups,
            mut report,
            unknown_ids,
        } = self.prepare()?;

        let exporter = self
            .config
            .output
            .enabled
            .then(|| Exporter::new(&self.data_dir, &self.config.output));
        let mut written = Vec::new();
        if let Some(exporter) = &exporter {
            written.extend(exporter.write_stage(Stage::Raw, &tables)?);
        }

        let cleaned = clean(tables, &lookups, &mut report, self.config.qc.report_missing)?;

        if let Some(exporter) = &exporter {
            written.extend(exporter.write_stage(Stage::Cleaned, &cleaned.tables)?);
            for (key, ids) in &unknown_ids {
                written.push(exporter.write_problem_ids(*key, ids)?);
            }
            if let Some(audits) = &cleaned.daily_audits {
                written.push(exporter.write_check("ref_date_problems.csv", &audits.ref_date_problems)?);
                written.push(exporter.write_check("sleepvariables.csv", &audits.sleep_variables)?);
            }
            written.push(exporter.write_report(&report)?);
        } else {
            info!("Output disabled; nothing written");
        }

        report.log_summary();
        Ok(RunOutcome {
            tables: cleaned.tables,
            report,
            written,
        })
    }
}

/// Copy the round-6 LSAS answers of the split identifier onto the real subject
///
/// The donor identifier is then removed from round 6 and from the daily table.
pub fn merge_split_submission(tables: &mut [(TableKey, Table)]) -> Result<()> {
    for (key, table) in tables.iter_mut() {
        let id_column = key.spec().id_column;
        match key {
            TableKey::Round6 => {
                let lsas: Vec<String> = table
                    .columns()
                    .iter()
                    .filter(|c| c.ends_with("_fear") || c.ends_with("_avoid"))
                    .cloned()
                    .collect();
                transplant_responses(table, id_column, SPLIT_DONOR, SPLIT_RECIPIENT, &lsas)?;
            }
            TableKey::Daily => {
                drop_identifier(table, id_column, SPLIT_DONOR)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Format, score and validate reconciled tables
pub fn clean(
    tables: Vec<(TableKey, Table)>,
    lookups: &Lookups,
    report: &mut RunReport,
    report_missing: bool,
) -> Result<Cleaned> {
    let mut daily_audits = None;
    let mut cleaned = Vec::with_capacity(tables.len());
    for (key, mut table) in tables {
        let before = table.len();
        match key {
            TableKey::Daily => {
                daily_audits = Some(format_daily(&mut table, report)?);
            }
            TableKey::Demographics => {
                format_demographics(&mut table, lookups, report)?;
                derive_normal_days(&mut table)?;
            }
            _ => format_wave(key, &mut table, lookups, report)?,
        }
        score_table(key, &mut table)?;
        qc::validate(key, &table, report_missing)?;
        info!(
            table = %key,
            rows_in = before,
            rows_out = table.len(),
            columns = table.columns().len(),
            "Cleaned table"
        );
        cleaned.push((key, table));
    }
    Ok(Cleaned {
        tables: cleaned,
        daily_audits,
    })
}
