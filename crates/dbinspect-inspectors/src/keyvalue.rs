//! Key-value store (Redis) inspector

use dbinspect_core::{BackendKind, Check, CheckInfo, CheckOutcome, Inspector, Result};
use tracing::debug;

/// Password shipped in the sample `redis.conf`
pub const DEFAULT_PASSWORD: &str = "foobared";

/// Checks defined by the key-value inspector
pub const CHECKS: [CheckInfo; 2] = [
    CheckInfo {
        id: "RDB-01",
        title: "Authentication password (requirepass)",
    },
    CheckInfo {
        id: "RDB-02",
        title: "ACL users",
    },
];

/// Read-only commands the key-value inspector needs
pub trait KeyValueSession {
    /// Value of a configuration parameter (`CONFIG GET`), `None` when unset
    fn config_get(&self, parameter: &str) -> Result<Option<String>>;

    /// Rules returned by `ACL LIST`, one per user
    fn acl_list(&self) -> Result<Vec<String>>;
}

/// Inspector over a key-value session
pub struct KeyValueInspector<S: KeyValueSession> {
    target: String,
    session: S,
}

impl<S: KeyValueSession> KeyValueInspector<S> {
    pub fn new(target: impl Into<String>, session: S) -> Self {
        Self {
            target: target.into(),
            session,
        }
    }

    fn password_check(&self) -> Result<CheckOutcome> {
        let id = CHECKS[0].id;
        let password = self.session.config_get("requirepass")?.unwrap_or_default();

        if password.is_empty() {
            Ok(CheckOutcome::fail(id, "No authentication password is configured"))
        } else if password == DEFAULT_PASSWORD {
            Ok(CheckOutcome::fail(
                id,
                "Authentication password is the well-known default",
            ))
        } else {
            Ok(CheckOutcome::pass(id, "An authentication password is configured"))
        }
    }

    fn acl_survey(&self) -> Result<CheckOutcome> {
        let id = CHECKS[1].id;
        let users = self.session.acl_list()?;
        debug!(server = %self.target, count = users.len(), "ACL users listed");

        if users.is_empty() {
            Ok(CheckOutcome::fail(id, "No ACL users exist"))
        } else {
            Ok(CheckOutcome::survey(id, format!("user list : {}", users.join(", "))))
        }
    }
}

impl<S: KeyValueSession> Inspector for KeyValueInspector<S> {
    fn backend(&self) -> BackendKind {
        BackendKind::Redis
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![
            Check::new(CHECKS[0], move || self.password_check()),
            Check::new(CHECKS[1], move || self.acl_survey()),
        ]
    }
}
