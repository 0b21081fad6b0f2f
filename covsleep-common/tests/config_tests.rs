//! Integration tests for config file loading and data folder resolution
//!
//! Tests that touch COVSLEEP_DATA_DIR are marked #[serial] so they never
//! observe each other's environment.

use covsleep_common::config::{
    default_data_dir, resolve_data_dir, ConfigOrigin, PipelineConfig, DATA_DIR_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(DATA_DIR_ENV, "/tmp/covsleep-env");
    let config = PipelineConfig {
        data_dir: Some("/tmp/covsleep-toml".to_string()),
        ..Default::default()
    };

    let dir = resolve_data_dir(Some("/tmp/covsleep-cli"), DATA_DIR_ENV, &config);
    assert_eq!(dir, PathBuf::from("/tmp/covsleep-cli"));

    env::remove_var(DATA_DIR_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_config_file() {
    env::set_var(DATA_DIR_ENV, "/tmp/covsleep-env");
    let config = PipelineConfig {
        data_dir: Some("/tmp/covsleep-toml".to_string()),
        ..Default::default()
    };

    let dir = resolve_data_dir(None, DATA_DIR_ENV, &config);
    assert_eq!(dir, PathBuf::from("/tmp/covsleep-env"));

    env::remove_var(DATA_DIR_ENV);
}

#[test]
#[serial]
fn test_config_file_beats_default() {
    env::remove_var(DATA_DIR_ENV);
    let config = PipelineConfig {
        data_dir: Some("/tmp/covsleep-toml".to_string()),
        ..Default::default()
    };

    let dir = resolve_data_dir(None, DATA_DIR_ENV, &config);
    assert_eq!(dir, PathBuf::from("/tmp/covsleep-toml"));
}

#[test]
#[serial]
fn test_falls_back_to_compiled_default() {
    env::remove_var(DATA_DIR_ENV);
    let dir = resolve_data_dir(None, DATA_DIR_ENV, &PipelineConfig::default());
    assert_eq!(dir, default_data_dir());
    assert!(dir.to_string_lossy().contains("covsleep"));
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.toml");
    let (config, origin) = PipelineConfig::load(Some(&path)).unwrap();
    assert_eq!(config, PipelineConfig::default());
    assert_eq!(origin, ConfigOrigin::Missing(path));
    assert!(origin.is_fallback());
}

#[test]
fn test_config_file_is_read() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[qc]\nreport_missing = true\n[logging]\nlevel = \"warn\"\n").unwrap();

    let (config, origin) = PipelineConfig::load(Some(&path)).unwrap();
    assert!(config.qc.report_missing);
    assert_eq!(config.logging.level, "warn");
    assert_eq!(origin, ConfigOrigin::File(path));
    assert!(!origin.is_fallback());
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "data_dir = [").unwrap();
    assert!(PipelineConfig::load(Some(&path)).is_err());
}
