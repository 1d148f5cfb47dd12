//! Configuration structures for dbinspect
//!
//! Server lists come either from a YAML/JSON file or from the `SERVERS`
//! environment variable (a JSON array). Credentials for the relational
//! sink come from the same file or from `DB_SERVERS`.

use crate::error::{InspectError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Environment variable holding the server list as a JSON array
pub const SERVERS_ENV: &str = "SERVERS";

/// Environment variable holding the relational sink credentials
pub const SINK_ENV: &str = "DB_SERVERS";

/// Table written by the relational sink when none is configured
pub const DEFAULT_TABLE: &str = "db_insp_result";

/// Database family a server descriptor targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackendKind {
    /// Document store
    MongoDb,
    /// Key-value store
    Redis,
    /// Wide-column store
    Cassandra,
    /// Time-series store
    InfluxDb,
}

impl BackendKind {
    /// Every known backend kind
    pub const ALL: [BackendKind; 4] = [
        BackendKind::MongoDb,
        BackendKind::Redis,
        BackendKind::Cassandra,
        BackendKind::InfluxDb,
    ];

    /// Canonical lowercase tag
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::MongoDb => "mongodb",
            BackendKind::Redis => "redis",
            BackendKind::Cassandra => "cassandra",
            BackendKind::InfluxDb => "influxdb",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(BackendKind::MongoDb),
            "redis" => Ok(BackendKind::Redis),
            "cassandra" | "scylla" => Ok(BackendKind::Cassandra),
            "influxdb" | "influx" => Ok(BackendKind::InfluxDb),
            _ => Err(format!("Unknown backend kind: {}", s)),
        }
    }
}

impl TryFrom<String> for BackendKind {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackendKind> for String {
    fn from(kind: BackendKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One server to inspect
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Address of the server
    #[serde(alias = "host")]
    pub ip: String,

    /// TCP port
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,

    /// Login name
    #[serde(default, alias = "user")]
    pub username: String,

    /// Login password
    #[serde(default, alias = "passwd")]
    pub password: String,

    /// Which inspector variant to build
    #[serde(alias = "dbtype", alias = "backend")]
    pub backend_kind: BackendKind,

    /// Keyspace, only used by wide-column servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyspace: Option<String>,
}

impl ServerDescriptor {
    /// Create a descriptor with empty credentials
    pub fn new(ip: impl Into<String>, port: u16, backend_kind: BackendKind) -> Self {
        Self {
            ip: ip.into(),
            port,
            username: String::new(),
            password: String::new(),
            backend_kind,
            keyspace: None,
        }
    }

    /// Set login credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the keyspace
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    /// `ip:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Whether a login name was supplied
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }

    /// A password was supplied without the login name it belongs to
    pub fn password_without_username(&self) -> bool {
        self.username.is_empty() && !self.password.is_empty()
    }
}

// Hand-written so passwords never reach logs.
impl std::fmt::Debug for ServerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDescriptor")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("backend_kind", &self.backend_kind)
            .field("keyspace", &self.keyspace)
            .finish()
    }
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {}", text))),
    }
}

/// Credentials for the relational result sink
#[derive(Clone, Serialize, Deserialize)]
pub struct SinkCredentials {
    /// Database location (host for server databases, file path for SQLite)
    #[serde(alias = "ip")]
    pub host: String,

    /// Login name
    #[serde(default)]
    pub user: String,

    /// Login password
    #[serde(default, alias = "passwd")]
    pub password: String,

    /// Target table
    #[serde(default = "default_table")]
    pub table: String,
}

impl std::fmt::Debug for SinkCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkCredentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("table", &self.table)
            .finish()
    }
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

/// Complete audit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Servers to inspect
    #[serde(default)]
    pub servers: Vec<ServerDescriptor>,

    /// Relational sink credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink: Option<SinkCredentials>,
}

impl AuditConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InspectError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Self::from_json_str(&content, &path.display().to_string())
        } else {
            // Assume YAML for other extensions
            Self::from_yaml_str(&content, &path.display().to_string())
        }
    }

    /// Parse a JSON configuration document
    pub fn from_json_str(content: &str, context: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| parse_error(context, e))
    }

    /// Parse a YAML configuration document
    pub fn from_yaml_str(content: &str, context: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| parse_error(context, e))
    }

    /// Load configuration from `SERVERS` and `DB_SERVERS`
    pub fn from_env() -> Result<Self> {
        let servers = std::env::var(SERVERS_ENV).map_err(|_| {
            InspectError::Config(format!("{} environment variable is not set", SERVERS_ENV))
        })?;

        let sink = std::env::var(SINK_ENV)
            .ok()
            .map(|raw| parse_sink_json(&raw))
            .transpose()?;

        Ok(Self {
            servers: parse_servers_json(&servers)?,
            sink,
        })
    }

    /// Check the configuration before anything is dispatched
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(InspectError::Config("server list is empty".to_string()));
        }

        for (index, server) in self.servers.iter().enumerate() {
            if server.ip.trim().is_empty() {
                return Err(InspectError::Config(format!("server #{} has an empty ip", index)));
            }
            if server.port == 0 {
                return Err(InspectError::Config(format!(
                    "server {} has port 0",
                    server.ip
                )));
            }
            // A MongoDB login needs a user; never fall back to anonymous access.
            if server.backend_kind == BackendKind::MongoDb && server.password_without_username() {
                return Err(InspectError::Config(format!(
                    "mongodb server {} has a password but no user",
                    server.address()
                )));
            }
            if server.backend_kind == BackendKind::Cassandra
                && server.keyspace.as_deref().map_or(true, |k| k.trim().is_empty())
            {
                return Err(InspectError::Config(format!(
                    "cassandra server {} requires a keyspace",
                    server.address()
                )));
            }
        }

        if let Some(sink) = &self.sink {
            if sink.host.trim().is_empty() {
                return Err(InspectError::Config("sink host is empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Parse a JSON array of server descriptors
pub fn parse_servers_json(raw: &str) -> Result<Vec<ServerDescriptor>> {
    serde_json::from_str(raw).map_err(|e| parse_error(SERVERS_ENV, e))
}

/// Parse a JSON object of sink credentials
pub fn parse_sink_json(raw: &str) -> Result<SinkCredentials> {
    serde_json::from_str(raw).map_err(|e| parse_error(SINK_ENV, e))
}

fn parse_error(context: &str, err: impl std::fmt::Display) -> InspectError {
    InspectError::Config(format!("invalid configuration in {}: {}", context, err))
}
