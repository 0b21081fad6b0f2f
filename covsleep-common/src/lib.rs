//! # covsleep common library
//!
//! Shared code for the survey-cleaning pipeline:
//! - Error taxonomy (format errors, invariant violations)
//! - Configuration loading and data folder resolution
//! - Clock times and sleep-interval arithmetic
//! - Timestamp parsing for survey exports
//! - In-memory table model

pub mod clock;
pub mod config;
pub mod error;
pub mod interval;
pub mod table;
pub mod time;

pub use clock::ClockTime;
pub use error::{Error, Result};
pub use interval::{IntervalPolicy, SleepInterval};
pub use table::{Table, Value};
