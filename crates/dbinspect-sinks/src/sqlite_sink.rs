//! SQLite table sink
//!
//! One TEXT column per report column, named as in
//! [`InspectionRecord::COLUMNS`], so the table mirrors the CSV report.

use dbinspect_core::{InspectError, InspectionRecord, Result, ResultSink, SinkCredentials};
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Inserts records into a relational table, one transaction per call
pub struct SqliteSink {
    path: PathBuf,
    table: String,
}

impl SqliteSink {
    /// Create a sink writing to `table` in the database file at `path`.
    ///
    /// The table name is interpolated into SQL, so it must be a plain
    /// identifier (ASCII letters, digits and underscores, not starting
    /// with a digit).
    pub fn new(path: impl Into<PathBuf>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(InspectError::Config(format!(
                "invalid table name '{}'",
                table
            )));
        }
        Ok(Self {
            path: path.into(),
            table,
        })
    }

    /// Build from the configured sink credentials; `host` names the
    /// database file
    pub fn from_credentials(credentials: &SinkCredentials) -> Result<Self> {
        if credentials.host.trim().is_empty() {
            return Err(InspectError::Config(
                "sink credentials are missing the database location".to_string(),
            ));
        }
        Self::new(&credentials.host, &credentials.table)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .map_err(|e| InspectError::Sink(format!("Failed to open database: {}", e)))?;

        let columns = InspectionRecord::COLUMNS
            .iter()
            .map(|column| format!("{} TEXT NOT NULL", column))
            .collect::<Vec<_>>()
            .join(", ");

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            self.table, columns
        ))
        .map_err(|e| InspectError::Sink(format!("Failed to create table: {}", e)))?;

        Ok(conn)
    }
}

impl ResultSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn persist(&self, records: &[InspectionRecord]) -> Result<()> {
        let mut conn = self.open()?;

        let tx = conn
            .transaction()
            .map_err(|e| InspectError::Sink(format!("Failed to start transaction: {}", e)))?;

        {
            let placeholders = (1..=InspectionRecord::COLUMNS.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");

            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    self.table,
                    InspectionRecord::COLUMNS.join(", "),
                    placeholders
                ))
                .map_err(|e| InspectError::Sink(format!("Failed to prepare statement: {}", e)))?;

            for record in records {
                stmt.execute(params_from_iter(record.to_row()))
                    .map_err(|e| InspectError::Sink(format!("Failed to insert record: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| InspectError::Sink(format!("Failed to commit transaction: {}", e)))?;

        debug!(table = %self.table, "Committed inspection records");
        info!(
            path = %self.path.display(),
            records = records.len(),
            "Inserted records into SQLite table"
        );
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
