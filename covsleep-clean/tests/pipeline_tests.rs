//! Integration tests for loading, assembly, reconciliation and the raw export
//!
//! Every test builds a small data folder in a temp directory with one file per
//! input named in the default config.

use covsleep_clean::export::{Exporter, Stage};
use covsleep_clean::pipeline::Pipeline;
use covsleep_clean::sources::{TableKey, SUB_ID, UNIQUE_ID};
use covsleep_common::config::{OutputConfig, PipelineConfig};
use covsleep_common::{Error, Table};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const R7_HEADER: &str = "ResponseId,SubjectID,IPAddress,Status,RecipientLastName,RecipientFirstName,\
RecipientEmail,ExternalReference,DistributionChannel,UserLanguage,LocationLatitude,\
LocationLongitude,Anger,Excitement";
const R7_QUESTION_ROWS: &str = "Response ID,Subject,IP,Status,Last,First,Email,Ref,Channel,\
Language,Lat,Long,Anger?,Excitement?\n\
ImportId_recordId,ImportId_QID2,x,x,x,x,x,x,x,x,x,x,x,x";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn data_folder() -> TempDir {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();

    write(root, "raw_data/IDs_For_DEID_Data.csv", "A1B2C4,17\nWSKA2,21\nZZ99Z,4\nQMP33,9\n");
    write(root, "raw_data/SubjID_Replacements.csv", "INCORRECT,CORRECT\nA1B2C3,A1B2C4\n");
    write(root, "reference/countries.txt", "United States\nCanada\n");
    write(
        root,
        "reference/state_abbreviations.csv",
        "state,long,short\nMassachusetts,MASSACHUSETTS,MA\n",
    );
    write(
        root,
        "raw_data/school_replacements_for_deid.csv",
        "ORIGINAL,REPLACEMENT\ncollege,Some college\n",
    );
    write(
        root,
        "raw_data/occupation_replacements_for_deid.csv",
        "old,new\nnurse,Healthcare\n",
    );

    write(
        root,
        "raw_data/daily_long.csv",
        "record_id,redcap_repeat_instrument,subjid_2,todays_date\n\
         1,covid19,a1b2c3,2020-04-10 08:00\n\
         2,covid19,ZZ99Z,2020-04-11 08:00\n\
         3,covid19,WSKA2_LSAS,2020-04-12 08:00\n",
    );
    write(
        root,
        "raw_data/daily_short.csv",
        "record_id,redcap_repeat_instrument,subjid_2,todays_date\n\
         1,covid19_short_survey,A1B2C4,2020-04-12 08:00\n",
    );
    write(
        root,
        "raw_data/demographics.csv",
        "record_id,subjid_1\n1,A1B2C4\n2,ZZ99Z\n",
    );
    write(
        root,
        "raw_data/Round1/round1.csv",
        "record_id,subjid_rd1\n1,A1B2C4\n2,NOPE1\n",
    );
    write(
        root,
        "raw_data/Round2/round2.csv",
        "record_id,subjid_rd2\n1,\" a1b2c3 \"\n2,QMP33\n3,A1B2C4\n",
    );
    write(root, "raw_data/Round3/round3.csv", "record_id,subjid_rd3\n1,ZZ99Z\n");
    write(root, "raw_data/Round4/round4.csv", "record_id,subjid_rd4\n1,ZZ99Z\n");
    write(
        root,
        "raw_data/Round5/round5.csv",
        "record_id,subjid_rd1,date_time_rd1\n1,ZZ99Z,2021-02-01 10:00\n",
    );
    write(
        root,
        "raw_data/Round6/april18.csv",
        "record_id,redcap_repeat_instrument,april_18_timestamp,subjid_2,todays_date,\
telephoneapril_fear,telephoneapril_avoid,perished_2,april_18_complete\n\
         5,,2020-04-18 10:00,WSKA2,2020-04-18 10:00,,,1,2\n\
         6,,2020-04-18 11:00,WSKA2_LSAS,2020-04-18 11:00,3,2,,2\n",
    );
    write(
        root,
        "raw_data/Round7/vaccine_retrospective.csv",
        &format!(
            "{}\n{}\nR_a,ZZ99Z,10.0.0.1,0,Doe,Jane,j@x.org,,anonymous,EN,42.3601,-71.0589,1,2\n",
            R7_HEADER, R7_QUESTION_ROWS
        ),
    );
    write(
        root,
        "raw_data/Round7/vaccine_retrospective_unvaxx.csv",
        &format!(
            "{}\n{}\nR_b,A1B2C4,10.0.0.2,0,Roe,Rick,r@x.org,,anonymous,EN,51.5072,-0.1276,3,4\n",
            R7_HEADER, R7_QUESTION_ROWS
        ),
    );
    write(
        root,
        "raw_data/Round8/round8.csv",
        "record_id,subjid_rd1,date_time_rd1\n1,A1B2C4,2021-10-01 10:00\n",
    );
    write(
        root,
        "raw_data/Round9/november15.csv",
        "record_id,redcap_repeat_instrument,nov15_timestamp,subjid_2,todays_date,est_us,vacc_plan,\
nov15_complete\n\
         7,,2021-11-15 09:00,ZZ99Z,2021-11-15 09:00,1,2,2\n",
    );
    temp
}

fn table(tables: &[(TableKey, Table)], key: TableKey) -> &Table {
    &tables.iter().find(|(k, _)| *k == key).unwrap().1
}

fn texts(table: &Table, column: &str) -> Vec<String> {
    table
        .column_values(column)
        .unwrap()
        .iter()
        .map(|v| v.key_text())
        .collect()
}

#[test]
fn test_prepare_reconciles_every_table() {
    let temp = data_folder();
    let prepared = Pipeline::new(PipelineConfig::default(), temp.path())
        .prepare()
        .unwrap();

    let keys: Vec<TableKey> = prepared.tables.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, TableKey::ALL.to_vec());
    assert_eq!(prepared.report.inputs.len(), 19);

    let r2 = table(&prepared.tables, TableKey::Round2);
    assert_eq!(r2.len(), 1);
    assert_eq!(r2.number(0, SUB_ID).unwrap(), Some(17.0));
    assert_eq!(prepared.report.reconciliation["r2"].excluded, 1);
    assert_eq!(prepared.report.reconciliation["r2"].duplicates_dropped, 1);

    assert_eq!(prepared.unknown_ids, vec![(TableKey::Round1, vec!["NOPE1".to_string()])]);
}

#[test]
fn test_daily_keys_and_order() {
    let temp = data_folder();
    let prepared = Pipeline::new(PipelineConfig::default(), temp.path())
        .prepare()
        .unwrap();
    let daily = table(&prepared.tables, TableKey::Daily);
    assert_eq!(daily.columns()[0], UNIQUE_ID);
    assert_eq!(texts(daily, UNIQUE_ID), vec!["2L", "7LB", "1L", "1S", "5LA"]);
    assert_eq!(texts(daily, SUB_ID), vec!["4", "4", "17", "17", "21"]);
}

#[test]
fn test_split_submission_is_merged() {
    let temp = data_folder();
    let prepared = Pipeline::new(PipelineConfig::default(), temp.path())
        .prepare()
        .unwrap();
    let r6 = table(&prepared.tables, TableKey::Round6);
    assert_eq!(r6.len(), 1);
    assert_eq!(r6.number(0, SUB_ID).unwrap(), Some(21.0));
    assert_eq!(r6.number(0, "telephoneapril_fear").unwrap(), Some(3.0));
    assert_eq!(r6.number(0, "telephoneapril_avoid").unwrap(), Some(2.0));
    assert_eq!(r6.number(0, "perished_2").unwrap(), Some(1.0));
}

#[test]
fn test_wave_corrections_before_raw_export() {
    let temp = data_folder();
    let prepared = Pipeline::new(PipelineConfig::default(), temp.path())
        .prepare()
        .unwrap();

    let r5 = table(&prepared.tables, TableKey::Round5);
    assert!(r5.has_column("date_time_rd5"));
    assert!(!r5.has_column("date_time_rd1"));

    let r7 = table(&prepared.tables, TableKey::Round7);
    assert_eq!(r7.len(), 2);
    assert_eq!(r7.columns()[0], "ResponseId");
    assert!(!r7.has_column("IPAddress"));
    assert!(!r7.has_column("RecipientEmail"));
    assert!(r7.has_column("Anger_During"));
    assert!(r7.has_column("Excitement_During"));
    let latitudes: Vec<Option<f64>> = r7.numbers("LocationLatitude").unwrap();
    assert!(latitudes.contains(&Some(42.4)));
    assert!(latitudes.contains(&Some(51.5)));
}

#[test]
fn test_raw_export_files() {
    let temp = data_folder();
    let prepared = Pipeline::new(PipelineConfig::default(), temp.path())
        .prepare()
        .unwrap();
    let output = OutputConfig {
        stamp: Some("2022-05-10_12_00".to_string()),
        ..Default::default()
    };
    let exporter = Exporter::new(temp.path(), &output);
    let files = exporter.write_stage(Stage::Raw, &prepared.tables).unwrap();
    assert_eq!(files.len(), 22);

    let demo = temp
        .path()
        .join("export/COVID19_demographics_raw_2022-05-10_12_00.csv");
    assert_eq!(
        fs::read_to_string(demo).unwrap(),
        "record_id,sub_id\n2,4\n1,17\n"
    );
    let round7_deid = temp
        .path()
        .join("export/COVID19_Round7_raw_deid_2022-05-10_12_00.csv");
    let text = fs::read_to_string(round7_deid).unwrap();
    assert!(!text.contains("LocationLatitude"));
}

#[test]
fn test_missing_input_is_not_found() {
    let temp = data_folder();
    fs::remove_file(temp.path().join("raw_data/Round3/round3.csv")).unwrap();
    let err = Pipeline::new(PipelineConfig::default(), temp.path())
        .prepare()
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_second_demographics_submission_is_fatal() {
    let temp = data_folder();
    write(
        temp.path(),
        "raw_data/demographics.csv",
        "record_id,subjid_1\n1,A1B2C4\n2,a1b2c3\n",
    );
    let err = Pipeline::new(PipelineConfig::default(), temp.path())
        .prepare()
        .unwrap_err();
    assert!(matches!(err, Error::Invariant(_)));
}
