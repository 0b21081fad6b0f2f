//! Source schema for the eleven logical survey tables
//!
//! Each [`TableKey`] carries a static [`SourceSpec`]: the identifier column the
//! respondents typed, the columns a row cannot be kept without, the record id,
//! how duplicate submissions are handled and which free-text columns the
//! de-identified export drops.
//!
//! [`assemble`] turns the raw files into the logical tables: the two daily
//! variants and the daily parts of the one-off waves are stacked, the April-18
//! and November-15 exports are split into their wave and daily parts, and the
//! two retrospective vaccine exports are stacked without their extra header rows.

use covsleep_common::{Error, Result, Table};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Repeat-instrument name of the long daily survey
pub const LONG_INSTRUMENT: &str = "covid19";
/// Repeat-instrument name of the short daily survey
pub const SHORT_INSTRUMENT: &str = "covid19_short_survey";
/// Completion column of the April-18 one-off wave
pub const APRIL18_COMPLETE: &str = "april_18_complete";
/// Completion column of the November-15 one-off wave
pub const NOV15_COMPLETE: &str = "nov15_complete";

/// Canonical subject id column written by the reconciler
pub const SUB_ID: &str = "sub_id";
/// Composite record key of the daily table
pub const UNIQUE_ID: &str = "unique_id";

/// Qualtrics writes two extra header rows under the column names
const QUALTRICS_HEADER_ROWS: usize = 2;

/// Logical table produced by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TableKey {
    Daily,
    Demographics,
    Round1,
    Round2,
    Round3,
    Round4,
    Round5,
    Round6,
    Round7,
    Round8,
    Round9,
}

/// What happens when one subject has several rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// One-time assessments: keep the first row in file order
    KeepFirst,
    /// A second row for the same subject aborts the run
    Reject,
    /// Repeating daily survey: keep every row, flag same-day repeats later
    FlagSameDay,
}

/// Static description of one logical table
#[derive(Debug, Clone, Copy)]
pub struct SourceSpec {
    pub key: TableKey,
    /// Free-text identifier column as exported
    pub id_column: &'static str,
    /// Columns that must be present for a row to be kept (besides the identifier)
    pub required_columns: &'static [&'static str],
    /// Row identifier that must be unique after reconciliation
    pub record_id: &'static str,
    pub duplicate_policy: DuplicatePolicy,
    /// Second sort key after `sub_id`
    pub sort_key: &'static str,
    /// Columns removed from the de-identified export
    pub deid_columns: &'static [&'static str],
}

impl TableKey {
    pub const ALL: [TableKey; 11] = [
        TableKey::Daily,
        TableKey::Demographics,
        TableKey::Round1,
        TableKey::Round2,
        TableKey::Round3,
        TableKey::Round4,
        TableKey::Round5,
        TableKey::Round6,
        TableKey::Round7,
        TableKey::Round8,
        TableKey::Round9,
    ];

    /// Label used in export file names (`COVID19_<label>_cleaned_<stamp>.csv`)
    pub fn export_label(&self) -> &'static str {
        match self {
            TableKey::Daily => "combined",
            TableKey::Demographics => "demographics",
            TableKey::Round1 => "Round1",
            TableKey::Round2 => "Round2",
            TableKey::Round3 => "Round3",
            TableKey::Round4 => "Round4",
            TableKey::Round5 => "Round5",
            TableKey::Round6 => "Round6",
            TableKey::Round7 => "Round7",
            TableKey::Round8 => "Round8",
            TableKey::Round9 => "Round9",
        }
    }

    /// Short label used for audit files and log fields
    pub fn check_label(&self) -> &'static str {
        match self {
            TableKey::Daily => "daily",
            TableKey::Demographics => "demo",
            TableKey::Round1 => "r1",
            TableKey::Round2 => "r2",
            TableKey::Round3 => "r3",
            TableKey::Round4 => "r4",
            TableKey::Round5 => "r5",
            TableKey::Round6 => "r6",
            TableKey::Round7 => "r7",
            TableKey::Round8 => "r8",
            TableKey::Round9 => "r9",
        }
    }

    pub fn spec(&self) -> SourceSpec {
        match self {
            TableKey::Daily => SourceSpec {
                key: *self,
                id_column: "subjid_2",
                required_columns: &["todays_date"],
                record_id: UNIQUE_ID,
                duplicate_policy: DuplicatePolicy::FlagSameDay,
                sort_key: "todays_date",
                deid_columns: &[
                    "sleepdiary_dreamcontent",
                    "sleepdiary_info",
                    "visit",
                    "respiratory_describe",
                    "full_open",
                    "open_question",
                ],
            },
            TableKey::Demographics => SourceSpec {
                key: *self,
                id_column: "subjid_1",
                required_columns: &[],
                record_id: "record_id",
                duplicate_policy: DuplicatePolicy::Reject,
                sort_key: "record_id",
                deid_columns: &[
                    "medical_description",
                    "institution_describe",
                    "additional_info",
                    "school",
                    "occupation",
                ],
            },
            TableKey::Round1 => wave(*self, "subjid_rd1", &["psqi_5j2"]),
            TableKey::Round2 => wave(
                *self,
                "subjid_rd2",
                &["challenging_free", "positive_free", "mundane_free", "unusual_free"],
            ),
            TableKey::Round3 => wave(
                *self,
                "subjid_rd3",
                &[
                    "city",
                    "highrisk_othercheck",
                    "quar_free",
                    "positive_free_response",
                    "covid_impact_free",
                    "occupation_other",
                    "sleepchange_free",
                    "med_free",
                    "med_other",
                    "psych_free_1",
                    "psych_free_2",
                    "condition_free",
                    "mil_time_free",
                    "mistakes_free",
                    "open_anything",
                    "open_anything_2",
                    "covdream_free",
                ],
            ),
            TableKey::Round4 => wave(
                *self,
                "subjid_rd4",
                &[
                    "fall_psqi_5j2",
                    "challenging_free_fut",
                    "positive_free_fut",
                    "mundane_free_fut",
                    "unusual_free_fut",
                    "ind_diff_rem_well",
                    "ind_diff_forget",
                ],
            ),
            TableKey::Round5 => wave(
                *self,
                "subjid_rd1",
                &[
                    "psqi_5j2",
                    "highrisk_othercheck",
                    "add_dets_cov",
                    "positive_free_response",
                    "covid_impact_free",
                    "city",
                ],
            ),
            TableKey::Round6 => wave(*self, "subjid_2", &["add_dets_cov"]),
            TableKey::Round7 => SourceSpec {
                key: *self,
                id_column: "SubjectID",
                required_columns: &[],
                record_id: "ResponseId",
                duplicate_policy: DuplicatePolicy::KeepFirst,
                sort_key: "ResponseId",
                deid_columns: &[
                    "Race_7_TEXT",
                    "Gender_5_TEXT",
                    "RecruitmentSource_6_TEXT",
                    "Q79",
                    "QID1",
                    "Q31",
                    "Q53",
                    "Q33",
                    "Q57",
                    "Q60",
                    "Q64",
                    "LocationLatitude",
                    "LocationLongitude",
                ],
            },
            TableKey::Round8 => wave(
                *self,
                "subjid_rd1",
                &[
                    "psqi_5j2",
                    "city",
                    "highrisk_othercheck",
                    "add_dets_cov",
                    "positive_free_response",
                    "covid_impact_free",
                ],
            ),
            TableKey::Round9 => wave(*self, "subjid_2", &["add_dets_cov"]),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.check_label())
    }
}

/// REDCap wave export keyed by `record_id`, first row per subject kept
fn wave(
    key: TableKey,
    id_column: &'static str,
    deid_columns: &'static [&'static str],
) -> SourceSpec {
    SourceSpec {
        key,
        id_column,
        required_columns: &[],
        record_id: "record_id",
        duplicate_policy: DuplicatePolicy::KeepFirst,
        sort_key: "record_id",
        deid_columns,
    }
}

/// Raw files as read from disk, before any reshaping
#[derive(Debug, Clone)]
pub struct RawSources {
    pub daily_long: Table,
    pub daily_short: Table,
    pub demographics: Table,
    pub round1: Table,
    pub round2: Table,
    pub round3: Table,
    pub round4: Table,
    pub round5: Table,
    pub april18: Table,
    pub round7_vaccinated: Table,
    pub round7_unvaccinated: Table,
    pub round8: Table,
    pub nov15: Table,
}

/// Split a combined one-off export into its wave table and its daily rows
///
/// The wave part holds `record_id`, the wave timestamp, `subjid_2`,
/// `todays_date`, every column of `start..=end` and the completion column. The
/// daily part holds every column outside the range.
pub fn split_wave(
    combined: &Table,
    wave_name: &str,
    timestamp: &str,
    start: &str,
    end: &str,
    complete: &str,
) -> Result<(Table, Table)> {
    let range = combined.columns_between(start, end)?;

    let mut wave_columns: Vec<String> = ["record_id", timestamp, "subjid_2", "todays_date"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    wave_columns.extend(range.iter().cloned());
    wave_columns.push(complete.to_string());
    let wave = combined.select_columns(wave_name, &wave_columns)?;

    let daily_columns: Vec<String> = combined
        .columns()
        .iter()
        .filter(|c| !range.contains(c))
        .cloned()
        .collect();
    let daily = combined.select_columns("daily", &daily_columns)?;

    debug!(
        source = combined.name(),
        wave_columns = wave_columns.len(),
        daily_columns = daily_columns.len(),
        "Split combined export"
    );
    Ok((wave, daily))
}

/// Build the eleven logical tables from the raw files
pub fn assemble(raw: RawSources) -> Result<Vec<(TableKey, Table)>> {
    let (round6, april18_daily) = split_wave(
        &raw.april18,
        "r6",
        "april_18_timestamp",
        "telephoneapril_fear",
        "perished_2",
        APRIL18_COMPLETE,
    )?;
    let (round9, nov15_daily) = split_wave(
        &raw.nov15,
        "r9",
        "nov15_timestamp",
        "est_us",
        "vacc_plan",
        NOV15_COMPLETE,
    )?;

    let mut daily = raw.daily_long;
    daily.set_name("daily");
    daily.append(raw.daily_short)?;
    daily.append(april18_daily)?;
    daily.append(nov15_daily)?;

    let mut unvaccinated = raw.round7_unvaccinated;
    unvaccinated.skip_rows(QUALTRICS_HEADER_ROWS);
    let mut vaccinated = raw.round7_vaccinated;
    vaccinated.skip_rows(QUALTRICS_HEADER_ROWS);
    unvaccinated.append(vaccinated)?;
    let mut round7 = unvaccinated;
    round7.set_name("r7");

    let mut tables = vec![
        (TableKey::Daily, daily),
        (TableKey::Demographics, raw.demographics),
        (TableKey::Round1, raw.round1),
        (TableKey::Round2, raw.round2),
        (TableKey::Round3, raw.round3),
        (TableKey::Round4, raw.round4),
        (TableKey::Round5, raw.round5),
        (TableKey::Round6, round6),
        (TableKey::Round7, round7),
        (TableKey::Round8, raw.round8),
        (TableKey::Round9, round9),
    ];
    for (key, table) in &mut tables {
        table.set_name(key.check_label());
        if !table.has_column(key.spec().id_column) {
            return Err(Error::invariant(format!(
                "table {} has no identifier column '{}'",
                key,
                key.spec().id_column
            )));
        }
    }

    info!(
        daily_rows = tables[0].1.len(),
        round7_rows = tables[8].1.len(),
        "Assembled logical tables"
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use covsleep_common::Value;

    fn table(name: &str, cols: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            name,
            cols.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Value::from_raw(v)).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_labels() {
        assert_eq!(TableKey::Daily.export_label(), "combined");
        assert_eq!(TableKey::Demographics.check_label(), "demo");
        assert_eq!(TableKey::Round7.export_label(), "Round7");
        assert_eq!(TableKey::Round9.to_string(), "r9");
    }

    #[test]
    fn test_policies() {
        assert_eq!(TableKey::Daily.spec().duplicate_policy, DuplicatePolicy::FlagSameDay);
        assert_eq!(TableKey::Demographics.spec().duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(TableKey::Round5.spec().id_column, "subjid_rd1");
        assert_eq!(TableKey::Round7.spec().record_id, "ResponseId");
        for key in TableKey::ALL {
            assert_eq!(key.spec().key, key);
        }
    }

    #[test]
    fn test_split_wave() {
        let combined = table(
            "april18",
            &[
                "record_id",
                "april_18_timestamp",
                "subjid_2",
                "todays_date",
                "sleepdiary_bedtime",
                "telephoneapril_fear",
                "perished_2",
                "april_18_complete",
            ],
            &[&["1", "2021-04-18 10:00", "AB12C", "2021-04-18", "23:00", "2", "1", "2"]],
        );
        let (wave, daily) = split_wave(
            &combined,
            "r6",
            "april_18_timestamp",
            "telephoneapril_fear",
            "perished_2",
            "april_18_complete",
        )
        .unwrap();
        assert_eq!(wave.columns().len(), 7);
        assert!(!wave.has_column("sleepdiary_bedtime"));
        assert!(daily.has_column("sleepdiary_bedtime"));
        assert!(daily.has_column("april_18_complete"));
        assert!(!daily.has_column("telephoneapril_fear"));
    }
}
