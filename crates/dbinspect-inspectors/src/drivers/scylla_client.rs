//! Cassandra binding over the `scylla` driver.
//!
//! The driver is async; each session owns a current-thread runtime so the
//! inspector stays blocking like the other backends.

use super::DriverOptions;
use crate::widecolumn::WideColumnSession;
use dbinspect_core::{InspectError, Result, ServerDescriptor};
use scylla::transport::errors::{DbError, NewSessionError, QueryError};
use scylla::{Session, SessionBuilder};
use tokio::runtime::{Builder, Runtime};

/// One Cassandra session plus the runtime driving it
pub struct CassandraSession {
    target: String,
    keyspace: Option<String>,
    options: DriverOptions,
    runtime: Runtime,
    session: Session,
}

impl CassandraSession {
    /// Connect with the descriptor's credentials and switch to its keyspace
    pub fn open(server: &ServerDescriptor, options: &DriverOptions) -> Result<Self> {
        let target = server.address();
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| InspectError::connection(&target, e))?;

        let session = runtime
            .block_on(connect(
                &target,
                &server.username,
                &server.password,
                server.keyspace.as_deref(),
                options,
            ))
            .map_err(|e| InspectError::connection(&target, e))?;

        Ok(Self {
            target,
            keyspace: server.keyspace.clone(),
            options: options.clone(),
            runtime,
            session,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Why a session could not be opened
#[derive(Debug)]
enum ConnectFailure {
    Session(NewSessionError),
    Keyspace(QueryError),
}

impl ConnectFailure {
    /// The server answered with an authentication error
    fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            ConnectFailure::Session(NewSessionError::DbError(DbError::AuthenticationError, _))
                | ConnectFailure::Keyspace(QueryError::DbError(DbError::AuthenticationError, _))
        )
    }
}

impl std::fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectFailure::Session(e) => write!(f, "{}", e),
            ConnectFailure::Keyspace(e) => write!(f, "cannot use keyspace: {}", e),
        }
    }
}

async fn connect(
    target: &str,
    username: &str,
    password: &str,
    keyspace: Option<&str>,
    options: &DriverOptions,
) -> std::result::Result<Session, ConnectFailure> {
    let session = SessionBuilder::new()
        .known_node(target)
        .user(username, password)
        .connection_timeout(options.connect_timeout)
        .build()
        .await
        .map_err(ConnectFailure::Session)?;

    if let Some(keyspace) = keyspace {
        session
            .use_keyspace(keyspace, false)
            .await
            .map_err(ConnectFailure::Keyspace)?;
    }

    Ok(session)
}

impl WideColumnSession for CassandraSession {
    fn setting(&self, name: &str) -> Result<Option<String>> {
        let result = self
            .runtime
            .block_on(self.session.query_unpaged(
                "SELECT value FROM system_views.settings WHERE name = ?",
                (name,),
            ))
            .map_err(|e| InspectError::check("CDB-02", e))?;

        let row = result
            .maybe_first_row_typed::<(Option<String>,)>()
            .map_err(|e| InspectError::check("CDB-02", e))?;

        Ok(row.and_then(|(value,)| value))
    }

    fn try_login(&self, username: &str, password: &str) -> Result<()> {
        let probe = self.runtime.block_on(connect(
            &self.target,
            username,
            password,
            self.keyspace.as_deref(),
            &self.options,
        ));

        match probe {
            // The probe session is dropped immediately.
            Ok(_session) => Ok(()),
            Err(failure) => Err(probe_error(&self.target, failure)),
        }
    }
}

fn probe_error(target: &str, failure: ConnectFailure) -> InspectError {
    if failure.is_auth_rejection() {
        InspectError::AuthenticationProbe {
            target: target.to_string(),
            message: failure.to_string(),
        }
    } else {
        InspectError::connection(target, failure)
    }
}
