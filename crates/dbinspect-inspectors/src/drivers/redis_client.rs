//! Redis binding over the synchronous `redis` client

use super::DriverOptions;
use crate::keyvalue::KeyValueSession;
use dbinspect_core::{InspectError, Result, ServerDescriptor};
use std::cell::RefCell;

/// One authenticated Redis connection
pub struct RedisSession {
    target: String,
    conn: RefCell<redis::Connection>,
}

impl RedisSession {
    /// Connect with the descriptor's credentials on database 0
    pub fn open(server: &ServerDescriptor, options: &DriverOptions) -> Result<Self> {
        let target = server.address();

        let info = redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(server.ip.clone(), server.port),
            redis: redis::RedisConnectionInfo {
                db: 0,
                username: non_empty(&server.username),
                password: non_empty(&server.password),
                ..Default::default()
            },
        };

        let client =
            redis::Client::open(info).map_err(|e| InspectError::connection(&target, e))?;
        let conn = client
            .get_connection_with_timeout(options.connect_timeout)
            .map_err(|e| InspectError::connection(&target, e))?;

        Ok(Self {
            target,
            conn: RefCell::new(conn),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn query(&self, check_id: &str, cmd: &redis::Cmd) -> Result<Vec<String>> {
        let mut conn = self.conn.borrow_mut();
        cmd.query::<Vec<String>>(&mut *conn)
            .map_err(|e| InspectError::check(check_id, e))
    }
}

impl KeyValueSession for RedisSession {
    fn config_get(&self, parameter: &str) -> Result<Option<String>> {
        let mut cmd = redis::cmd("CONFIG");
        cmd.arg("GET").arg(parameter);

        // Reply is [name, value]; an empty reply means the parameter is unknown.
        let reply = self.query("RDB-01", &cmd)?;
        Ok(reply.into_iter().nth(1).filter(|value| !value.is_empty()))
    }

    fn acl_list(&self) -> Result<Vec<String>> {
        let mut cmd = redis::cmd("ACL");
        cmd.arg("LIST");
        self.query("RDB-02", &cmd)
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
