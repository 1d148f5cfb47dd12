//! Append-only CSV report

use dbinspect_core::{InspectError, InspectionRecord, Result, ResultSink};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Byte-order mark written at the start of a new report so spreadsheet
/// applications detect UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV file sink with create-or-append semantics.
///
/// The header row is written only when the file is created (or empty);
/// later runs append rows after the last existing row.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn persist(&self, records: &[InspectionRecord]) -> Result<()> {
        let is_new = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| sink_error(&self.path, e))?;

        if is_new {
            file.write_all(UTF8_BOM).map_err(|e| sink_error(&self.path, e))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            writer
                .write_record(InspectionRecord::COLUMNS)
                .map_err(|e| sink_error(&self.path, e))?;
        }

        for record in records {
            writer
                .write_record(record.to_row())
                .map_err(|e| sink_error(&self.path, e))?;
        }

        writer.flush().map_err(|e| sink_error(&self.path, e))?;

        info!(
            path = %self.path.display(),
            records = records.len(),
            created = is_new,
            "Appended records to CSV report"
        );
        Ok(())
    }
}

fn sink_error(path: &Path, err: impl std::fmt::Display) -> InspectError {
    InspectError::Sink(format!("{}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbinspect_core::{CheckOutcome, RunStamp};

    fn records(ip: &str) -> Vec<InspectionRecord> {
        let stamp = RunStamp::capture(ip);
        vec![
            stamp.record(CheckOutcome::fail("DB-01", "admin, ops")),
            stamp.record(CheckOutcome::survey("DB-02", "admin : system.users\nshop : orders\n")),
        ]
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let content = std::fs::read_to_string(path).unwrap();
        let content = content.trim_start_matches('\u{feff}');
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(content.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_creates_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("report.csv"));

        sink.persist(&records("10.0.0.1")).unwrap();

        let bytes = std::fs::read(sink.path()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let rows = read_rows(sink.path());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], InspectionRecord::COLUMNS.to_vec());
        assert_eq!(rows[1][3], "DB-01");
        assert_eq!(rows[1][4], "False");
        assert_eq!(rows[2][5], "admin : system.users\nshop : orders\n");
    }

    #[test]
    fn test_appending_twice_keeps_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("report.csv"));

        sink.persist(&records("10.0.0.1")).unwrap();
        sink.persist(&records("10.0.0.2")).unwrap();
        sink.persist(&records("10.0.0.3")).unwrap();

        let rows = read_rows(sink.path());
        let headers = rows.iter().filter(|r| r[0] == "RUN_DATE").count();
        assert_eq!(headers, 1);
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[1][1], "10.0.0.1");
        assert_eq!(rows[3][1], "10.0.0.2");
        assert_eq!(rows[6][1], "10.0.0.3");

        let content = std::fs::read(sink.path()).unwrap();
        let boms = content.windows(UTF8_BOM.len()).filter(|w| *w == UTF8_BOM).count();
        assert_eq!(boms, 1);
    }

    #[test]
    fn test_empty_result_set_still_creates_report() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("empty.csv"));
        sink.persist(&[]).unwrap();
        assert_eq!(read_rows(sink.path()).len(), 1);
    }

    #[test]
    fn test_unwritable_path_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("missing").join("report.csv"));
        assert!(matches!(sink.persist(&records("10.0.0.1")), Err(InspectError::Sink(_))));
    }
}
