//! covsleep-clean - Main entry point
//!
//! Batch cleaning of the COVID-19 sleep and psychological survey exports:
//! reads the raw files below the data folder and writes the raw and cleaned
//! CSV exports plus the audit files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use covsleep_clean::Pipeline;
use covsleep_common::config::{resolve_data_dir, LoggingConfig, PipelineConfig, DATA_DIR_ENV};
use covsleep_common::Error;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for covsleep-clean
#[derive(Parser, Debug)]
#[command(name = "covsleep-clean")]
#[command(about = "Cleans the COVID-19 sleep and psychological survey exports")]
#[command(version)]
struct Args {
    /// Data folder holding raw_data/ and reference/
    #[arg(short, long, env = DATA_DIR_ENV)]
    data_dir: Option<String>,

    /// Config file (default: <config dir>/covsleep/config.toml)
    #[arg(short, long, env = "COVSLEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Run every stage without writing any file
    #[arg(long)]
    no_output: bool,

    /// Log missing-value counts per column of every cleaned table
    #[arg(long)]
    report_missing: bool,

    /// Fixed output stamp (YYYY-MM-DD_HH_MM) instead of the current time
    #[arg(long)]
    stamp: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let loaded = PipelineConfig::load(args.config.as_deref());
    let directive = match &loaded {
        Ok((config, _)) => config.logging.filter_directive(),
        Err(_) => LoggingConfig::default().filter_directive(),
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = loaded
        .context("Failed to load configuration")
        .and_then(|(config, origin)| {
            origin.log();
            run(args, config)
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let defect = err.chain().find_map(|e| e.downcast_ref::<Error>());
            match defect {
                Some(e) if e.is_data_defect() => {
                    error!(error = %format!("{:#}", err), "Raw data failed a check")
                }
                _ => error!(error = %format!("{:#}", err), "Run aborted"),
            }
            ExitCode::from(defect.map_or(1, Error::exit_code))
        }
    }
}

fn run(args: Args, mut config: PipelineConfig) -> Result<()> {
    if args.no_output {
        config.output.enabled = false;
    }
    if args.report_missing {
        config.qc.report_missing = true;
    }
    if args.stamp.is_some() {
        config.output.stamp = args.stamp.clone();
    }

    // The CLI argument already covers the environment variable through clap
    let data_dir = resolve_data_dir(args.data_dir.as_deref(), DATA_DIR_ENV, &config);
    info!(data_dir = %data_dir.display(), "Starting covsleep-clean");

    let outcome = Pipeline::new(config, data_dir)
        .run()
        .context("Cleaning run failed")?;

    info!(
        tables = outcome.tables.len(),
        files = outcome.written.len(),
        "Cleaning complete"
    );
    Ok(())
}
