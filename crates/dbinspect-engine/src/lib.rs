//! Orchestration engine for dbinspect
//!
//! Runs inspectors across many servers concurrently and aggregates their
//! records into one report.

mod orchestrator;
mod output;
mod runner;

pub use orchestrator::*;
pub use output::*;
pub use runner::*;
