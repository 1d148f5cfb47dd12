//! Bindings from the session traits to real database drivers.
//!
//! Each binding is compiled only with its cargo feature.

use std::time::Duration;

#[cfg(feature = "mongodb")]
pub mod mongo_client;

#[cfg(feature = "redis")]
pub mod redis_client;

#[cfg(feature = "cassandra")]
pub mod scylla_client;

/// Settings shared by all driver bindings
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Upper bound for establishing a session
    pub connect_timeout: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}
