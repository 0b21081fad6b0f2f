//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the data folder
pub const DATA_DIR_ENV: &str = "COVSLEEP_DATA_DIR";

/// Participants who are ineligible for the study (underage or duplicate enrollments)
pub const DEFAULT_EXCLUSIONS: [&str; 5] = ["54DLL", "A2YXX", "7QU6Y", "PMMTT", "QMP33"];

/// Pipeline configuration read from `config.toml`
///
/// Every section is optional; missing keys fall back to the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Data folder (priority 3 of [`resolve_data_dir`])
    pub data_dir: Option<String>,
    pub inputs: InputFiles,
    pub identity: IdentityConfig,
    pub output: OutputConfig,
    pub qc: QcConfig,
    pub logging: LoggingConfig,
}

/// Raw input locations, relative to the data folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFiles {
    pub daily_long: String,
    pub daily_short: String,
    pub demographics: String,
    pub round1: String,
    pub round2: String,
    pub round3: String,
    pub round4: String,
    pub round5: String,
    pub april18: String,
    pub round7_vaccinated: String,
    pub round7_unvaccinated: String,
    pub round8: String,
    pub nov15: String,
    pub roster: String,
    pub corrections: String,
    pub countries: String,
    pub states: String,
    pub schools: String,
    pub occupations: String,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            daily_long: "raw_data/daily_long.csv".to_string(),
            daily_short: "raw_data/daily_short.csv".to_string(),
            demographics: "raw_data/demographics.csv".to_string(),
            round1: "raw_data/Round1/round1.csv".to_string(),
            round2: "raw_data/Round2/round2.csv".to_string(),
            round3: "raw_data/Round3/round3.csv".to_string(),
            round4: "raw_data/Round4/round4.csv".to_string(),
            round5: "raw_data/Round5/round5.csv".to_string(),
            april18: "raw_data/Round6/april18.csv".to_string(),
            round7_vaccinated: "raw_data/Round7/vaccine_retrospective.csv".to_string(),
            round7_unvaccinated: "raw_data/Round7/vaccine_retrospective_unvaxx.csv".to_string(),
            round8: "raw_data/Round8/round8.csv".to_string(),
            nov15: "raw_data/Round9/november15.csv".to_string(),
            roster: "raw_data/IDs_For_DEID_Data.csv".to_string(),
            corrections: "raw_data/SubjID_Replacements.csv".to_string(),
            countries: "reference/countries.txt".to_string(),
            states: "reference/state_abbreviations.csv".to_string(),
            schools: "raw_data/school_replacements_for_deid.csv".to_string(),
            occupations: "raw_data/occupation_replacements_for_deid.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Identifiers dropped before canonical ID assignment
    pub exclusions: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            exclusions: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// When false nothing is written (exports, audit files, run report)
    pub enabled: bool,
    /// Export folder, relative to the data folder
    pub export_dir: String,
    /// Audit/check folder, relative to the data folder
    pub check_dir: String,
    /// Fixed `YYYY-MM-DD_HH_MM` stamp; the current local time when unset
    pub stamp: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            export_dir: "export".to_string(),
            check_dir: "data_check".to_string(),
            stamp: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// Log per-column missing counts after validation
    pub report_missing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for the pipeline crates when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive covering both pipeline crates
    pub fn filter_directive(&self) -> String {
        format!("covsleep_clean={0},covsleep_common={0}", self.level)
    }
}

impl PipelineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load an explicit or platform-default config file
    ///
    /// A missing file is not an error: the built-in defaults are used and the
    /// returned [`ConfigOrigin`] says so. A file that exists but does not parse
    /// is an error. Nothing is logged here; callers log the origin once their
    /// subscriber is installed.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigOrigin)> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok((Self::default(), ConfigOrigin::NoConfigDir)),
            },
        };

        if !path.exists() {
            return Ok((Self::default(), ConfigOrigin::Missing(path)));
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        Ok((config, ConfigOrigin::File(path)))
    }
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from this file
    File(PathBuf),
    /// Built-in defaults; the file does not exist
    Missing(PathBuf),
    /// Built-in defaults; the platform has no config directory
    NoConfigDir,
}

impl ConfigOrigin {
    /// True when the built-in defaults are in use
    pub fn is_fallback(&self) -> bool {
        !matches!(self, ConfigOrigin::File(_))
    }

    /// Record the origin; a fallback to defaults is a warning
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => debug!(path = %path.display(), "Loaded config file"),
            ConfigOrigin::Missing(path) => {
                warn!(path = %path.display(), "Config file not found, using defaults")
            }
            ConfigOrigin::NoConfigDir => {
                warn!("Could not determine config directory, using defaults")
            }
        }
    }
}

/// Platform config file location (`<config dir>/covsleep/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("covsleep").join("config.toml"))
}

/// Data folder resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `data_dir` key of the TOML config
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config: &PipelineConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = config.data_dir.as_deref() {
        return PathBuf::from(path);
    }

    // Priority 4: OS-dependent compiled default
    default_data_dir()
}

/// OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/covsleep
        dirs::data_local_dir()
            .map(|d| d.join("covsleep"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/covsleep"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/covsleep
        dirs::data_dir()
            .map(|d| d.join("covsleep"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/covsleep"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\covsleep
        dirs::data_local_dir()
            .map(|d| d.join("covsleep"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\covsleep"))
    } else {
        PathBuf::from("./covsleep_data")
    }
}
