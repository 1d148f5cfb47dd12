//! Wide-column store (Cassandra) inspector

use dbinspect_core::{BackendKind, Check, CheckInfo, CheckOutcome, Inspector, Result};
use tracing::{debug, warn};

/// Superuser created by a fresh installation
pub const DEFAULT_USERNAME: &str = "cassandra";

/// Password of [`DEFAULT_USERNAME`] on a fresh installation
pub const DEFAULT_PASSWORD: &str = "cassandra";

/// The only authenticator accepted as secure
pub const PASSWORD_AUTHENTICATOR: &str = "PasswordAuthenticator";

/// Checks defined by the wide-column inspector
pub const CHECKS: [CheckInfo; 2] = [
    CheckInfo {
        id: "CDB-01",
        title: "Default superuser password",
    },
    CheckInfo {
        id: "CDB-02",
        title: "Authenticator setting",
    },
];

/// Queries and probes the wide-column inspector needs
pub trait WideColumnSession {
    /// Value of a row in `system_views.settings`, `None` when absent
    fn setting(&self, name: &str) -> Result<Option<String>>;

    /// Open and discard a separate session with the given credentials.
    ///
    /// Returns `InspectError::AuthenticationProbe` when the server rejects
    /// the login.
    fn try_login(&self, username: &str, password: &str) -> Result<()>;
}

/// Inspector over a wide-column session
pub struct WideColumnInspector<S: WideColumnSession> {
    target: String,
    session: S,
}

impl<S: WideColumnSession> WideColumnInspector<S> {
    pub fn new(target: impl Into<String>, session: S) -> Self {
        Self {
            target: target.into(),
            session,
        }
    }

    fn default_credential_check(&self) -> Result<CheckOutcome> {
        let id = CHECKS[0].id;

        match self.session.try_login(DEFAULT_USERNAME, DEFAULT_PASSWORD) {
            Ok(()) => {
                warn!(server = %self.target, "Default superuser credentials accepted");
                Ok(CheckOutcome::fail(
                    id,
                    "The default account still uses its default password",
                ))
            }
            Err(e) if e.is_auth_rejection() => {
                debug!(server = %self.target, "Default credential probe rejected");
                Ok(CheckOutcome::pass(
                    id,
                    "The default account password has been changed",
                ))
            }
            Err(e) => Err(e),
        }
    }

    fn authenticator_check(&self) -> Result<CheckOutcome> {
        let id = CHECKS[1].id;

        match self.session.setting("authenticator")? {
            Some(value) if value == PASSWORD_AUTHENTICATOR => Ok(CheckOutcome::pass(
                id,
                "authenticator is set to PasswordAuthenticator in cassandra.yaml",
            )),
            Some(value) => Ok(CheckOutcome::fail(
                id,
                format!("authenticator is set to {} in cassandra.yaml", value),
            )),
            None => Ok(CheckOutcome::fail(
                id,
                "authenticator is not set in cassandra.yaml",
            )),
        }
    }
}

impl<S: WideColumnSession> Inspector for WideColumnInspector<S> {
    fn backend(&self) -> BackendKind {
        BackendKind::Cassandra
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![
            Check::new(CHECKS[0], move || self.default_credential_check()),
            Check::new(CHECKS[1], move || self.authenticator_check()),
        ]
    }
}
