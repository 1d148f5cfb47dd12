//! Core traits that define the inspection abstraction layer.
//!
//! Backend adapters implement [`Inspector`], drivers are reached through a
//! [`Connector`], and results leave through a [`ResultSink`].

use crate::config::{BackendKind, ServerDescriptor};
use crate::error::{InspectError, Result};
use crate::record::{CheckOutcome, InspectionRecord};

/// Static description of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInfo {
    /// Report code, e.g. `RDB-01`
    pub id: &'static str,
    /// Human-readable title
    pub title: &'static str,
}

/// One runnable check bound to a connected inspector
pub struct Check<'a> {
    info: CheckInfo,
    run: Box<dyn Fn() -> Result<CheckOutcome> + 'a>,
}

impl<'a> Check<'a> {
    pub fn new(info: CheckInfo, run: impl Fn() -> Result<CheckOutcome> + 'a) -> Self {
        Self {
            info,
            run: Box::new(run),
        }
    }

    pub fn id(&self) -> &'static str {
        self.info.id
    }

    pub fn info(&self) -> CheckInfo {
        self.info
    }

    /// Execute the check
    pub fn run(&self) -> Result<CheckOutcome> {
        (self.run)()
    }
}

impl std::fmt::Debug for Check<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check").field("info", &self.info).finish()
    }
}

/// A connected session to one server exposing a fixed, ordered set of checks.
///
/// The underlying connection is released when the inspector is dropped, so
/// every exit path (including unwinding) closes it exactly once.
pub trait Inspector {
    /// Backend family of the connected server
    fn backend(&self) -> BackendKind;

    /// `ip:port` of the connected server
    fn target(&self) -> &str;

    /// Checks in declaration order
    fn checks(&self) -> Vec<Check<'_>>;

    /// Explicitly release the connection
    fn close(self: Box<Self>) {}
}

/// Builds inspectors for server descriptors
pub trait Connector: Send + Sync {
    /// Establish a session using the descriptor's credentials
    fn connect(&self, server: &ServerDescriptor) -> Result<Box<dyn Inspector>>;
}

/// Persists an aggregated result set
pub trait ResultSink {
    /// Sink name for logs
    fn name(&self) -> &str;

    /// Persist the records
    fn persist(&self, records: &[InspectionRecord]) -> Result<()>;
}

/// Progress reporting abstraction for UI/CLI.
///
/// Server callbacks are invoked from the inspection threads.
pub trait ProgressReporter: Send + Sync {
    /// Called once before any task is spawned
    fn dispatch_started(&self, servers: usize);

    /// Called when a server task begins
    fn server_started(&self, server: &ServerDescriptor);

    /// Called when a server task produced its records
    fn server_completed(&self, server: &ServerDescriptor, records: usize);

    /// Called when a server task failed
    fn server_failed(&self, server: &ServerDescriptor, error: &InspectError);

    /// Called after aggregation
    fn run_completed(&self, total_records: usize);
}

/// No-op progress reporter for silent operation
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn dispatch_started(&self, _servers: usize) {}
    fn server_started(&self, _server: &ServerDescriptor) {}
    fn server_completed(&self, _server: &ServerDescriptor, _records: usize) {}
    fn server_failed(&self, _server: &ServerDescriptor, _error: &InspectError) {}
    fn run_completed(&self, _total_records: usize) {}
}

/// Output format for the console summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}
