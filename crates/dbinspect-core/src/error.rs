//! Error types for dbinspect

use crate::config::BackendKind;
use thiserror::Error;

/// Main error type for dbinspect operations
#[derive(Error, Debug)]
pub enum InspectError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or missing server/sink configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A session to the target server could not be established
    #[error("Connection to {target} failed: {message}")]
    Connection { target: String, message: String },

    /// The server rejected a deliberate default-credential login
    #[error("Authentication rejected by {target}: {message}")]
    AuthenticationProbe { target: String, message: String },

    /// A check query failed
    #[error("Check {check_id} failed: {message}")]
    CheckExecution { check_id: String, message: String },

    /// Backend kind has no inspector adapter
    #[error("No inspector is implemented for backend {0}")]
    NotImplemented(BackendKind),

    /// Adapter exists but its driver was not compiled in
    #[error("Driver for backend {0} is not compiled in (enable the `{0}` feature)")]
    DriverUnavailable(BackendKind),

    /// Result persistence failed
    #[error("Sink error: {0}")]
    Sink(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An inspection task panicked
    #[error("Inspection task panicked: {0}")]
    TaskPanicked(String),
}

impl InspectError {
    /// Build a connection error for `target`
    pub fn connection(target: impl Into<String>, message: impl ToString) -> Self {
        InspectError::Connection {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Build a check execution error for `check_id`
    pub fn check(check_id: impl Into<String>, message: impl ToString) -> Self {
        InspectError::CheckExecution {
            check_id: check_id.into(),
            message: message.to_string(),
        }
    }

    /// Operation that was running when the error was raised.
    pub fn phase(&self) -> &'static str {
        match self {
            InspectError::Config(_) => "config",
            InspectError::Connection { .. }
            | InspectError::NotImplemented(_)
            | InspectError::DriverUnavailable(_) => "connect",
            InspectError::AuthenticationProbe { .. } => "probe",
            InspectError::CheckExecution { .. } => "check",
            InspectError::Sink(_) => "persist",
            InspectError::TaskPanicked(_) => "task",
            InspectError::Io(_) | InspectError::Serialization(_) => "io",
        }
    }

    /// Whether this is the expected rejection of a default-credential probe
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, InspectError::AuthenticationProbe { .. })
    }
}

impl From<serde_json::Error> for InspectError {
    fn from(err: serde_json::Error) -> Self {
        InspectError::Serialization(err.to_string())
    }
}

/// Result type alias for dbinspect operations
pub type Result<T> = std::result::Result<T, InspectError>;
