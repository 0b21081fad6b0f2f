//! One-time wave formatting
//!
//! Each wave gets its own formatter: timestamps and dates parsed (with the
//! wave's "no answer" sentinel dates blanked), clock items parsed, PSQI codes
//! moved to start at 0, plausibility rules, and free-text country, state and
//! vaccine answers mapped to closed vocabularies.
//!
//! [`pre_raw_corrections`] runs earlier, before the raw export: consistent
//! column names and the round-7 de-identification.

use crate::normalize::categorical::{
    likert_to_codes, normalize_country, normalize_state, normalize_vaccine,
};
use crate::normalize::range::{
    blank_above, blank_dates_after, blank_dates_before, blank_not_completed, parse_clocks,
    parse_dates_with_sentinels, parse_timestamps, replace_text, scale, shift,
};
use crate::normalize::vocab::{
    Dict, LikertLabels, AGREEMENT, DOZING, FREQUENCY, INTENSITY, LIKELIHOOD, R3_COUNTRY,
    R3_STATE, R5_COUNTRY, R5_STATE, R5_VACCINE, R6_VACCINE, R8_COUNTRY, R8_STATE, R8_VACCINE,
    R9_STATE, R9_VACCINE, TRUTH, VACCINE_BRANDS, VACCINE_BRANDS_R8, VACCINE_BRANDS_R9,
};
use crate::normalize::{Lookups, Replacements, StateScope};
use crate::report::RunReport;
use crate::scoring::{mctq, psqi, MctqLayout, PsqiLayout};
use crate::sources::TableKey;
use chrono::NaiveDate;
use covsleep_common::time::date;
use covsleep_common::{Error, Result, Table, Value};
use tracing::{debug, info};

/// Round-7 columns that identify the respondent or the survey invitation
const R7_IDENTIFYING: [&str; 8] = [
    "IPAddress",
    "Status",
    "RecipientLastName",
    "RecipientFirstName",
    "RecipientEmail",
    "ExternalReference",
    "DistributionChannel",
    "UserLanguage",
];

const VACCINE_RECALL_PREFIX: &str = "VaccinePhems_";

/// Label sets of the round-7 text-coded items, by column prefix
const R7_LIKERT: [(&str, &LikertLabels); 6] = [
    ("SilverLinings_", &AGREEMENT),
    ("Q89_", &LIKELIHOOD),
    ("Q90_", &DOZING),
    ("Q91_", &TRUTH),
    ("Q92_", &INTENSITY),
    ("Q93_", &FREQUENCY),
];

const MAX_SLEEP_HOURS: f64 = 24.0;
const MAX_WORKDAYS: f64 = 7.0;
const MAX_AGE: f64 = 118.0;

/// Renames and de-identification applied before the raw export
pub fn pre_raw_corrections(key: TableKey, table: &mut Table) -> Result<()> {
    match key {
        TableKey::Round5 => {
            table.rename_if_present("date_time_rd1", "date_time_rd5")?;
        }
        TableKey::Round8 => {
            table.rename_if_present("date_time_rd1", "date_time_rd8")?;
        }
        TableKey::Round7 => deidentify_round7(table)?,
        _ => {}
    }
    table.move_to_front(key.spec().record_id)
}

fn round_to_tenth(table: &mut Table, column: &str) -> Result<()> {
    table.map_column(column, |v| {
        Ok(Value::from_option(v.as_number()?.map(|n| (n * 10.0).round_ties_even() / 10.0)))
    })
}

/// New name of a vaccine-recall column
///
/// The export repeats the recall block per dose, so duplicate headers were
/// suffixed `.1` (second dose) and `.2` (single dose) on load.
fn vaccine_recall_name(column: &str) -> String {
    if let Some(stem) = column.strip_suffix(".1") {
        format!("{}_2ndDose", stem)
    } else if let Some(stem) = column.strip_suffix(".2") {
        format!("{}_SingleDose", stem)
    } else {
        format!("{}_FirstDose", column)
    }
}

fn deidentify_round7(table: &mut Table) -> Result<()> {
    table.drop_columns(&R7_IDENTIFYING)?;
    round_to_tenth(table, "LocationLatitude")?;
    round_to_tenth(table, "LocationLongitude")?;

    let recall: Vec<String> = table.columns_with_prefix(VACCINE_RECALL_PREFIX);
    for column in &recall {
        table.rename_column(column, &vaccine_recall_name(column))?;
    }
    let repeated: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| c.ends_with(".1"))
        .cloned()
        .collect();
    for column in &repeated {
        let stem = column.trim_end_matches(".1");
        table.rename_column(column, &format!("{}_Now", stem))?;
    }
    let emotions = table.columns_between("Anger", "Excitement")?;
    for column in &emotions {
        table.rename_column(column, &format!("{}_During", column))?;
    }
    debug!(
        recall = recall.len(),
        repeated = repeated.len(),
        emotions = emotions.len(),
        "De-identified round 7"
    );
    Ok(())
}

/// Per-wave formatting context
struct Wave<'a> {
    key: TableKey,
    table: &'a mut Table,
    report: &'a mut RunReport,
}

impl Wave<'_> {
    fn label(&self) -> &'static str {
        self.key.check_label()
    }

    /// Survey timestamp with the unfinished marker blanked
    fn survey_timestamp(&mut self, column: &str) -> Result<()> {
        blank_not_completed(self.table, column)?;
        parse_timestamps(self.table, column)
    }

    fn dates(&mut self, columns: &[&str]) -> Result<()> {
        for column in columns {
            parse_timestamps(self.table, column)?;
        }
        Ok(())
    }

    fn dates_with_sentinels(&mut self, column: &str, sentinels: &[&str]) -> Result<()> {
        let blanked = parse_dates_with_sentinels(self.table, column, sentinels)?;
        self.report.record_plausibility(self.label(), column, blanked);
        Ok(())
    }

    fn clocks(&mut self, columns: &[&str]) -> Result<()> {
        for column in columns {
            parse_clocks(self.table, column)?;
        }
        Ok(())
    }

    fn at_most(&mut self, column: &str, max: f64) -> Result<()> {
        let blanked = blank_above(self.table, column, max)?;
        self.report.record_plausibility(self.label(), column, blanked);
        Ok(())
    }

    fn not_before(&mut self, column: &str, first: NaiveDate) -> Result<()> {
        let blanked = blank_dates_before(self.table, column, first)?;
        self.report.record_plausibility(self.label(), column, blanked);
        Ok(())
    }

    fn not_after(&mut self, column: &str, last: NaiveDate) -> Result<()> {
        let blanked = blank_dates_after(self.table, column, last)?;
        self.report.record_plausibility(self.label(), column, blanked);
        Ok(())
    }

    /// PSQI clocks parsed, codes from 0, hours asleep at most 24
    fn psqi_items(&mut self, layout: &PsqiLayout) -> Result<()> {
        for column in layout.clock_items() {
            parse_clocks(self.table, &column)?;
        }
        for column in layout.coded_items() {
            shift(self.table, &column, -1.0)?;
        }
        self.at_most(&layout.item("4"), MAX_SLEEP_HOURS)
    }

    /// MCTQ clocks parsed, work days at most 7
    fn mctq_items(&mut self, layout: &MctqLayout) -> Result<()> {
        self.clocks(&layout.clock_items())?;
        self.at_most(layout.workdays, MAX_WORKDAYS)
    }

    /// Country and state of residence over the last three months
    fn residence(&mut self, lookups: &Lookups, country: Dict, state: Dict) -> Result<()> {
        normalize_country(
            self.table,
            "country_3mo",
            &Replacements::from_static(country),
            &lookups.countries,
        )?;
        normalize_state(
            self.table,
            "state_3mo",
            &Replacements::from_static(state),
            &lookups.states,
            StateScope::BlankOutsideNorthAmerica("country_3mo"),
        )
    }
}

/// Format one reconciled wave table in place
pub fn format_wave(
    key: TableKey,
    table: &mut Table,
    lookups: &Lookups,
    report: &mut RunReport,
) -> Result<()> {
    let mut wave = Wave { key, table, report };
    match key {
        TableKey::Round1 => round1(&mut wave)?,
        TableKey::Round2 => round2(&mut wave)?,
        TableKey::Round3 => round3(&mut wave, lookups)?,
        TableKey::Round4 => round4(&mut wave)?,
        TableKey::Round5 => round5(&mut wave, lookups)?,
        TableKey::Round6 => round6(&mut wave)?,
        TableKey::Round7 => round7(&mut wave)?,
        TableKey::Round8 => round8(&mut wave, lookups)?,
        TableKey::Round9 => round9(&mut wave, lookups)?,
        TableKey::Daily | TableKey::Demographics => {
            return Err(Error::InvalidInput(format!(
                "{} is not a one-time wave",
                key
            )))
        }
    }
    info!(table = %key, rows = wave.table.len(), "Formatted wave");
    Ok(())
}

fn round1(w: &mut Wave) -> Result<()> {
    w.survey_timestamp("round_1_timestamp")?;
    w.dates(&["date_time_rd1"])?;
    w.table.rename_if_present("psqi_5h_2", "psqi_5i")?;
    w.table.rename_if_present("mtq_p8", "mtq_4")?;
    w.table.rename_if_present("mtq_p9", "mtq_5")?;
    w.table.rename_if_present("mtq_p10", "mtq_6")?;
    w.psqi_items(&psqi::ROUND1)?;
    w.mctq_items(&mctq::ROUND1_PRE)?;
    w.mctq_items(&mctq::ROUND1_POST)
}

fn round2(w: &mut Wave) -> Result<()> {
    w.survey_timestamp("round_2_timestamp")?;
    w.dates(&[
        "date_time_rd2",
        "stayhome_begin_us",
        "stayhome_end_us",
        "stayhome_begin",
        "normal_date",
        "meetings_date",
    ])?;
    w.dates_with_sentinels("mask_date", &["9999-09-09"])?;
    w.dates_with_sentinels("bigevents_date", &["0201-03-01"])?;
    w.dates_with_sentinels("shaking_hands_date", &["0101-01-01", "3000-06-20", "5050-05-05"])?;
    w.dates_with_sentinels("stayhome_end", &["0101-01-01"])
}

fn round3(w: &mut Wave, lookups: &Lookups) -> Result<()> {
    w.survey_timestamp("round_3_timestamp")?;
    w.dates(&["date_time_rd3"])?;
    w.at_most("age", MAX_AGE)?;
    w.residence(lookups, R3_COUNTRY, R3_STATE)
}

fn round4(w: &mut Wave) -> Result<()> {
    w.survey_timestamp("round_4_timestamp")?;
    w.dates(&["date_time_rd4"])?;
    w.not_before("date_time_rd4", date(2020, 9, 27)?)?;
    replace_text(w.table, "stayhome_end_fut", "3020-05-11", "2020-05-11")?;
    w.dates(&[
        "stayhome_begin_us_fut",
        "stayhome_end_us_fut",
        "stayhome_begin_fut",
        "stayhome_end_fut",
    ])?;
    w.psqi_items(&psqi::ROUND4)?;
    w.mctq_items(&mctq::ROUND4)
}

fn round5(w: &mut Wave, lookups: &Lookups) -> Result<()> {
    w.survey_timestamp("round_5_timestamp")?;
    w.dates_with_sentinels("normal_date_feb", &["3030-10-10", "2600-01-01"])?;
    for column in [
        "mask_date_feb",
        "meetings_date_feb",
        "bigevents_date_feb",
        "shakinghands_date_feb",
    ] {
        w.dates_with_sentinels(column, &["2600-01-01"])?;
    }
    let mut dates: Vec<String> = ["date_time_rd5", "date_cov", "vacc_date"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    for column in w.table.columns() {
        if column.contains("_date_") && !dates.contains(&column) {
            dates.push(column);
        }
    }
    for column in &dates {
        parse_timestamps(w.table, column)?;
    }

    w.psqi_items(&psqi::ROUND5)?;
    w.mctq_items(&mctq::ROUND5)?;
    w.residence(lookups, R5_COUNTRY, R5_STATE)?;
    normalize_vaccine(
        w.table,
        "vacc_type",
        &Replacements::from_static(R5_VACCINE),
        VACCINE_BRANDS,
    )?;
    // Answered in half-weeks
    scale(w.table, "bs_fall", 0.5)?;
    scale(w.table, "bs_sp2021", 0.5)
}

fn round6(w: &mut Wave) -> Result<()> {
    w.survey_timestamp("april_18_timestamp")?;
    w.dates(&["todays_date", "vacc_date", "date_cov"])?;
    normalize_vaccine(
        w.table,
        "vacc_type",
        &Replacements::from_static(R6_VACCINE),
        VACCINE_BRANDS,
    )
}

/// Text columns whose every answer is a plain digit string become numbers
fn coerce_digit_columns(table: &mut Table) -> Result<usize> {
    let digits = |v: &Value| match v {
        Value::Missing => true,
        Value::Text(s) => !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    };
    let numeric: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| {
            table
                .column_values(c)
                .map(|values| values.iter().all(digits))
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    for column in &numeric {
        table.map_column(column, |v| Ok(Value::from_option(v.as_number()?)))?;
    }
    Ok(numeric.len())
}

fn round7(w: &mut Wave) -> Result<()> {
    w.dates(&["StartDate", "RecordedDate"])?;
    let numeric = coerce_digit_columns(w.table)?;
    debug!(columns = numeric, "Numeric text columns converted");
    for (prefix, labels) in R7_LIKERT {
        for column in w.table.columns_with_prefix(prefix) {
            likert_to_codes(w.table, &column, labels)?;
        }
    }
    Ok(())
}

fn round8(w: &mut Wave, lookups: &Lookups) -> Result<()> {
    w.survey_timestamp("round_8_timestamp")?;
    w.dates(&["date_time_rd8", "date_cov", "vacc_date"])?;
    w.psqi_items(&psqi::ROUND8)?;
    w.mctq_items(&mctq::ROUND8)?;
    w.not_before("vacc_date", date(2020, 1, 1)?)?;
    w.residence(lookups, R8_COUNTRY, R8_STATE)?;
    normalize_vaccine(
        w.table,
        "vacc_type",
        &Replacements::from_static(R8_VACCINE),
        VACCINE_BRANDS_R8,
    )
}

fn round9(w: &mut Wave, lookups: &Lookups) -> Result<()> {
    w.survey_timestamp("nov15_timestamp")?;
    w.dates(&["todays_date", "date_cov", "vacc_date"])?;
    w.dates_with_sentinels("vacc_date_boost", &["0421-01-01"])?;
    normalize_state(
        w.table,
        "est_state",
        &Replacements::from_static(R9_STATE),
        &lookups.states,
        StateScope::All,
    )?;
    let corrections = Replacements::from_static(R9_VACCINE);
    for column in ["vacc_type", "vacc_type_boost"] {
        normalize_vaccine(w.table, column, &corrections, VACCINE_BRANDS_R9)?;
    }
    let last = date(2022, 3, 31)?;
    w.not_after("vacc_date", last)?;
    w.not_before("vacc_date_boost", date(2021, 1, 1)?)?;
    w.not_after("vacc_date_boost", last)
}
