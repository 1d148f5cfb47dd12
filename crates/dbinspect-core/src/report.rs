//! Aggregated results of one orchestration run

use crate::config::{BackendKind, ServerDescriptor};
use crate::record::{CheckStatus, InspectionRecord};
use serde::{Deserialize, Serialize};

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Dispatching,
    AwaitingResults,
    Aggregating,
    /// Every server contributed its records
    Completed,
    /// At least one server contributed nothing
    PartiallyFailed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Dispatching => write!(f, "dispatching"),
            RunState::AwaitingResults => write!(f, "awaiting results"),
            RunState::Aggregating => write!(f, "aggregating"),
            RunState::Completed => write!(f, "completed"),
            RunState::PartiallyFailed => write!(f, "partially failed"),
        }
    }
}

/// How one server task ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// Checks completed
    Inspected { records: usize },
    /// Task failed; contributes zero records
    Failed { phase: String, error: String },
    /// No report before the run deadline
    TimedOut,
}

/// Per-server outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSummary {
    pub ip: String,
    pub port: u16,
    pub backend: BackendKind,
    #[serde(flatten)]
    pub status: TaskStatus,
}

impl ServerSummary {
    pub fn new(server: &ServerDescriptor, status: TaskStatus) -> Self {
        Self {
            ip: server.ip.clone(),
            port: server.port,
            backend: server.backend_kind,
            status,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, TaskStatus::Inspected { .. })
    }
}

/// Complete result set of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// When dispatch started
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// When aggregation finished
    pub completed_at: chrono::DateTime<chrono::Utc>,

    /// Terminal state
    pub state: RunState,

    /// One entry per dispatched server, in dispatch order
    pub servers: Vec<ServerSummary>,

    /// Concatenated records of all successful servers
    pub records: Vec<InspectionRecord>,
}

impl RunReport {
    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    /// Servers that contributed no records
    pub fn failed_servers(&self) -> impl Iterator<Item = &ServerSummary> {
        self.servers.iter().filter(|s| !s.succeeded())
    }

    /// Number of records with `status`
    pub fn count_status(&self, status: CheckStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// Records belonging to `ip`, in check order
    pub fn records_for<'a>(&'a self, ip: &'a str) -> impl Iterator<Item = &'a InspectionRecord> + 'a {
        self.records.iter().filter(move |r| r.server_ip == ip)
    }
}
