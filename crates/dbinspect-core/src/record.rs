//! Canonical inspection records
//!
//! Every backend produces [`CheckOutcome`]s; the check runner stamps them
//! with the server identity and the task's start time to form
//! [`InspectionRecord`]s, the only shape sinks ever see.

use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};

/// Result status of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Configuration is compliant
    Pass,
    /// Configuration is insecure
    Fail,
    /// Informational enumeration, not a compliance judgement
    Survey,
}

impl CheckStatus {
    /// Result code written to report columns
    pub fn code(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "True",
            CheckStatus::Fail => "False",
            CheckStatus::Survey => "Survey",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "pass"),
            CheckStatus::Fail => write!(f, "fail"),
            CheckStatus::Survey => write!(f, "survey"),
        }
    }
}

/// Output of one check invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check_id: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl CheckOutcome {
    pub fn new(check_id: impl Into<String>, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            check_id: check_id.into(),
            status,
            detail: detail.into(),
        }
    }

    pub fn pass(check_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(check_id, CheckStatus::Pass, detail)
    }

    pub fn fail(check_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(check_id, CheckStatus::Fail, detail)
    }

    pub fn survey(check_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(check_id, CheckStatus::Survey, detail)
    }
}

/// Follow-up columns filled in by operators after the report is produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionFields {
    pub resolve_period: String,
    pub resolve_method: String,
    pub resolve_sch_date: String,
    pub resolve_exc_yn: String,
    pub resolve_exc_reason: String,
    pub evid_file_path: String,
    pub evid_file_org_name: String,
    pub evid_file_mod_name: String,
}

impl Default for ResolutionFields {
    fn default() -> Self {
        let blank = || " ".to_string();
        Self {
            resolve_period: blank(),
            resolve_method: blank(),
            resolve_sch_date: blank(),
            resolve_exc_yn: "N".to_string(),
            resolve_exc_reason: blank(),
            evid_file_path: blank(),
            evid_file_org_name: blank(),
            evid_file_mod_name: blank(),
        }
    }
}

/// Server identity and wall-clock time captured once at task start
#[derive(Debug, Clone)]
pub struct RunStamp {
    server_ip: String,
    captured_at: DateTime<Local>,
}

impl RunStamp {
    /// Capture the current local time for `server_ip`
    pub fn capture(server_ip: impl Into<String>) -> Self {
        Self::at(server_ip, Local::now())
    }

    /// Use a fixed time
    pub fn at(server_ip: impl Into<String>, captured_at: DateTime<Local>) -> Self {
        Self {
            server_ip: server_ip.into(),
            captured_at,
        }
    }

    pub fn server_ip(&self) -> &str {
        &self.server_ip
    }

    /// Date without zero padding, e.g. `2024-3-7`
    pub fn run_date(&self) -> String {
        format!(
            "{}-{}-{}",
            self.captured_at.year(),
            self.captured_at.month(),
            self.captured_at.day()
        )
    }

    /// Minute-resolution timestamp, e.g. `2024-03-07 09:05`
    pub fn run_time(&self) -> String {
        self.captured_at.format("%Y-%m-%d %H:%M").to_string()
    }

    /// Turn a check outcome into a canonical record
    pub fn record(&self, outcome: CheckOutcome) -> InspectionRecord {
        InspectionRecord {
            run_date: self.run_date(),
            server_ip: self.server_ip.clone(),
            run_time: self.run_time(),
            check_id: outcome.check_id,
            status: outcome.status,
            detail: outcome.detail,
            resolution: ResolutionFields::default(),
        }
    }
}

/// Canonical, sink-agnostic unit of output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub run_date: String,
    pub server_ip: String,
    pub run_time: String,
    pub check_id: String,
    pub status: CheckStatus,
    pub detail: String,
    #[serde(flatten)]
    pub resolution: ResolutionFields,
}

impl InspectionRecord {
    /// Report column headers, in row order
    pub const COLUMNS: [&'static str; 14] = [
        "RUN_DATE",
        "IP",
        "RUN_TIME",
        "INSP_CODE",
        "INSP_RES_CODE",
        "INSP_RES_DATA",
        "RESOLVE_PERIOD",
        "RESOLVE_METHOD",
        "RESOLVE_SCH_DATE",
        "RESOLVE_EXC_YN",
        "RESOLVE_EXC_REASON",
        "EVID_FILE_PATH",
        "EVID_FILE_ORG_NAME",
        "EVID_FILE_MOD_NAME",
    ];

    /// Field values in [`Self::COLUMNS`] order
    pub fn to_row(&self) -> [&str; 14] {
        let r = &self.resolution;
        [
            self.run_date.as_str(),
            self.server_ip.as_str(),
            self.run_time.as_str(),
            self.check_id.as_str(),
            self.status.code(),
            self.detail.as_str(),
            r.resolve_period.as_str(),
            r.resolve_method.as_str(),
            r.resolve_sch_date.as_str(),
            r.resolve_exc_yn.as_str(),
            r.resolve_exc_reason.as_str(),
            r.evid_file_path.as_str(),
            r.evid_file_org_name.as_str(),
            r.evid_file_mod_name.as_str(),
        ]
    }
}

/// Ordered records produced by inspecting one server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionRun {
    pub server_ip: String,
    pub records: Vec<InspectionRecord>,
}

impl InspectionRun {
    /// An empty run for `server_ip`
    pub fn empty(server_ip: impl Into<String>) -> Self {
        Self {
            server_ip: server_ip.into(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: InspectionRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `check_id` is already present
    pub fn contains(&self, check_id: &str) -> bool {
        self.records.iter().any(|r| r.check_id == check_id)
    }

    pub fn into_records(self) -> Vec<InspectionRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp() -> RunStamp {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 42).unwrap();
        RunStamp::at("10.0.0.2", at)
    }

    #[test]
    fn test_run_date_is_not_zero_padded() {
        assert_eq!(stamp().run_date(), "2024-3-7");
        assert_eq!(stamp().run_time(), "2024-03-07 09:05");
    }

    #[test]
    fn test_record_from_outcome() {
        let record = stamp().record(CheckOutcome::fail("RDB-01", "no password"));
        assert_eq!(record.server_ip, "10.0.0.2");
        assert_eq!(record.check_id, "RDB-01");
        assert_eq!(record.status, CheckStatus::Fail);
        assert_eq!(record.resolution.resolve_exc_yn, "N");
        assert_eq!(record.resolution.resolve_method, " ");
    }

    #[test]
    fn test_row_matches_columns() {
        let record = stamp().record(CheckOutcome::survey("DB-02", "admin : system.users"));
        let row = record.to_row();
        assert_eq!(row.len(), InspectionRecord::COLUMNS.len());
        assert_eq!(row[3], "DB-02");
        assert_eq!(row[4], "Survey");
        assert_eq!(row[9], "N");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CheckStatus::Pass.code(), "True");
        assert_eq!(CheckStatus::Fail.code(), "False");
        assert_eq!(CheckStatus::Survey.code(), "Survey");
    }
}
