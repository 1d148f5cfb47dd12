//! dbinspect Core
//!
//! Core types, traits, and error handling shared by the inspectors, the
//! orchestration engine and the result sinks.

pub mod config;
pub mod error;
pub mod record;
pub mod report;
pub mod traits;

pub use config::*;
pub use error::{InspectError, Result};
pub use record::*;
pub use report::*;
pub use traits::*;
