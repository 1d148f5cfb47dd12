//! Database Security Inspectors for dbinspect
//!
//! One inspector per backend family, each written against a narrow session
//! trait so the checks can run over real drivers or in-memory fakes.
//!
//! # Backends
//!
//! - Document store (MongoDB): `DB-01`, `DB-02`
//! - Key-value store (Redis): `RDB-01`, `RDB-02`
//! - Wide-column store (Cassandra): `CDB-01`, `CDB-02`
//! - Time-series store (InfluxDB): no inspector yet
//!
//! # Example
//!
//! ```no_run
//! use dbinspect_core::{BackendKind, Connector, ServerDescriptor};
//! use dbinspect_inspectors::DriverConnector;
//!
//! let server = ServerDescriptor::new("10.0.0.2", 6379, BackendKind::Redis)
//!     .with_credentials("default", "secret");
//!
//! let inspector = DriverConnector::new().connect(&server)?;
//! for check in inspector.checks() {
//!     println!("{:?}", check.run());
//! }
//! # Ok::<(), dbinspect_core::InspectError>(())
//! ```

pub mod document;
pub mod drivers;
pub mod keyvalue;
pub mod widecolumn;

pub use document::{DocumentInspector, DocumentSession};
pub use drivers::DriverOptions;
pub use keyvalue::{KeyValueInspector, KeyValueSession};
pub use widecolumn::{WideColumnInspector, WideColumnSession};

use dbinspect_core::{
    BackendKind, CheckInfo, Connector, InspectError, Inspector, Result, ServerDescriptor,
};
use tracing::debug;

/// Static description of one backend
#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub kind: BackendKind,
    pub checks: &'static [CheckInfo],
    /// Whether an adapter exists and its driver is compiled in
    pub available: bool,
}

/// Checks declared for `kind`, in run order
pub fn checks_for(kind: BackendKind) -> &'static [CheckInfo] {
    match kind {
        BackendKind::MongoDb => &document::CHECKS,
        BackendKind::Redis => &keyvalue::CHECKS,
        BackendKind::Cassandra => &widecolumn::CHECKS,
        BackendKind::InfluxDb => &[],
    }
}

/// Whether inspections of `kind` can run in this build
pub fn driver_available(kind: BackendKind) -> bool {
    match kind {
        BackendKind::MongoDb => cfg!(feature = "mongodb"),
        BackendKind::Redis => cfg!(feature = "redis"),
        BackendKind::Cassandra => cfg!(feature = "cassandra"),
        BackendKind::InfluxDb => false,
    }
}

/// Every backend with its checks
pub fn catalogue() -> Vec<BackendInfo> {
    BackendKind::ALL
        .iter()
        .map(|&kind| BackendInfo {
            kind,
            checks: checks_for(kind),
            available: driver_available(kind),
        })
        .collect()
}

/// Connector dispatching on the descriptor's backend kind to the
/// compiled-in drivers
#[derive(Debug, Clone, Default)]
pub struct DriverConnector {
    options: DriverOptions,
}

impl DriverConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: DriverOptions) -> Self {
        self.options = options;
        self
    }
}

impl Connector for DriverConnector {
    fn connect(&self, server: &ServerDescriptor) -> Result<Box<dyn Inspector>> {
        debug!(server = %server.address(), backend = %server.backend_kind, "Connecting");

        match server.backend_kind {
            BackendKind::MongoDb => {
                if server.password_without_username() {
                    return Err(InspectError::connection(
                        server.address(),
                        "password supplied without a user; refusing anonymous access",
                    ));
                }
                connect_mongodb(server, &self.options)
            }
            BackendKind::Redis => connect_redis(server, &self.options),
            BackendKind::Cassandra => connect_cassandra(server, &self.options),
            BackendKind::InfluxDb => Err(InspectError::NotImplemented(BackendKind::InfluxDb)),
        }
    }
}

#[cfg(feature = "mongodb")]
fn connect_mongodb(server: &ServerDescriptor, options: &DriverOptions) -> Result<Box<dyn Inspector>> {
    let session = drivers::mongo_client::MongoSession::open(server, options)?;
    Ok(Box::new(DocumentInspector::new(server.address(), session)))
}

#[cfg(not(feature = "mongodb"))]
fn connect_mongodb(_server: &ServerDescriptor, _options: &DriverOptions) -> Result<Box<dyn Inspector>> {
    Err(InspectError::DriverUnavailable(BackendKind::MongoDb))
}

#[cfg(feature = "redis")]
fn connect_redis(server: &ServerDescriptor, options: &DriverOptions) -> Result<Box<dyn Inspector>> {
    let session = drivers::redis_client::RedisSession::open(server, options)?;
    Ok(Box::new(KeyValueInspector::new(server.address(), session)))
}

#[cfg(not(feature = "redis"))]
fn connect_redis(_server: &ServerDescriptor, _options: &DriverOptions) -> Result<Box<dyn Inspector>> {
    Err(InspectError::DriverUnavailable(BackendKind::Redis))
}

#[cfg(feature = "cassandra")]
fn connect_cassandra(server: &ServerDescriptor, options: &DriverOptions) -> Result<Box<dyn Inspector>> {
    let session = drivers::scylla_client::CassandraSession::open(server, options)?;
    Ok(Box::new(WideColumnInspector::new(server.address(), session)))
}

#[cfg(not(feature = "cassandra"))]
fn connect_cassandra(_server: &ServerDescriptor, _options: &DriverOptions) -> Result<Box<dyn Inspector>> {
    Err(InspectError::DriverUnavailable(BackendKind::Cassandra))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_influxdb_fails_fast() {
        let server = ServerDescriptor::new("10.0.0.4", 8086, BackendKind::InfluxDb);
        let err = DriverConnector::new().connect(&server).err().unwrap();
        assert!(matches!(err, InspectError::NotImplemented(BackendKind::InfluxDb)));
    }

    #[test]
    fn test_catalogue_declares_two_checks_per_implemented_backend() {
        for info in catalogue() {
            match info.kind {
                BackendKind::InfluxDb => {
                    assert!(info.checks.is_empty());
                    assert!(!info.available);
                }
                _ => assert_eq!(info.checks.len(), 2, "{}", info.kind),
            }
        }
    }

    #[test]
    fn test_check_ids_are_unique() {
        let mut ids: Vec<_> = catalogue()
            .iter()
            .flat_map(|b| b.checks.iter().map(|c| c.id))
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_mongodb_password_without_user_is_refused() {
        let server = ServerDescriptor::new("10.0.0.1", 27017, BackendKind::MongoDb)
            .with_credentials("", "pw");
        let err = DriverConnector::new().connect(&server).err().unwrap();
        match err {
            InspectError::Connection { target, message } => {
                assert_eq!(target, "10.0.0.1:27017");
                assert!(message.contains("anonymous"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn test_missing_driver_is_reported() {
        let server = ServerDescriptor::new("10.0.0.2", 6379, BackendKind::Redis);
        let err = DriverConnector::new().connect(&server).err().unwrap();
        assert!(matches!(err, InspectError::DriverUnavailable(BackendKind::Redis)));
    }
}
