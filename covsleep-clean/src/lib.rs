//! covsleep-clean library interface
//!
//! Exposes the pipeline stages for the binary and for integration testing.

pub mod daily;
pub mod demographics;
pub mod export;
pub mod identity;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod qc;
pub mod report;
pub mod rounds;
pub mod scoring;
pub mod sources;

pub use pipeline::{Pipeline, RunOutcome};
pub use report::RunReport;
pub use sources::TableKey;
