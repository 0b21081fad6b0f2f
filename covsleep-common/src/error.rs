//! Common error types for the cleaning pipeline
//!
//! Every variant aborts a run. Implausible-but-valid values are not errors:
//! they are blanked and counted in the run report instead.
//!
//! Exit codes split data defects (2) from environment failures (1).

use thiserror::Error;

/// Common result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the pipeline stages
#[derive(Error, Debug)]
pub enum Error {
    /// A raw value does not match its expected lexical pattern
    #[error("Format error: {0}")]
    Format(String),

    /// A structural precondition was violated after a transformation
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error (wraps csv::Error)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested input file or column not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid argument passed by a caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Table storage error (wraps polars::error::PolarsError)
    #[error("Table error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),
}

impl Error {
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::Invariant(msg.into())
    }

    /// True for errors caused by the raw data rather than the environment
    pub fn is_data_defect(&self) -> bool {
        matches!(self, Error::Format(_) | Error::Invariant(_))
    }

    /// Process exit code for a run that failed with this error
    pub fn exit_code(&self) -> u8 {
        if self.is_data_defect() {
            2
        } else {
            1
        }
    }
}
