//! JSON report file

use dbinspect_core::{InspectError, InspectionRecord, Result, ResultSink};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes the result set as a single JSON array, replacing any previous
/// content of the file
pub struct JsonSink {
    path: PathBuf,
    pretty: bool,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: true,
        }
    }

    /// Emit compact JSON instead of indented output
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    fn persist(&self, records: &[InspectionRecord]) -> Result<()> {
        let file = File::create(&self.path)
            .map_err(|e| InspectError::Sink(format!("{}: {}", self.path.display(), e)))?;
        let mut writer = BufWriter::new(file);

        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, records)?;
        } else {
            serde_json::to_writer(&mut writer, records)?;
        }
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| InspectError::Sink(format!("{}: {}", self.path.display(), e)))?;

        info!(path = %self.path.display(), records = records.len(), "Wrote JSON report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbinspect_core::{CheckOutcome, CheckStatus, RunStamp};

    #[test]
    fn test_writes_array_of_records() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonSink::new(dir.path().join("report.json"));
        let stamp = RunStamp::capture("10.0.0.9");
        let records = vec![
            stamp.record(CheckOutcome::fail("RDB-01", "No authentication password is configured")),
            stamp.record(CheckOutcome::survey("RDB-02", "user list : default")),
        ];

        sink.persist(&records).unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let parsed: Vec<InspectionRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, records);

        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[0]["check_id"], "RDB-01");
        assert_eq!(value[0]["resolve_exc_yn"], "N");
        assert_eq!(parsed[1].status, CheckStatus::Survey);
    }

    #[test]
    fn test_overwrites_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonSink::new(dir.path().join("report.json")).compact();
        let stamp = RunStamp::capture("10.0.0.9");

        sink.persist(&[stamp.record(CheckOutcome::pass("CDB-02", "PasswordAuthenticator"))])
            .unwrap();
        sink.persist(&[]).unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content.trim(), "[]");
    }
}
