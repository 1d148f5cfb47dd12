//! Output formatting for run reports

use dbinspect_core::{CheckStatus, Result, RunReport, TaskStatus};

/// Format a run report as text
pub fn format_text(report: &RunReport, show_records: bool) -> String {
    let mut output = String::new();

    // Header
    output.push_str(&format!(
        "Database Security Inspection Report\n{}\n\n",
        "=".repeat(35)
    ));
    output.push_str(&format!("Started: {}\n", report.started_at.to_rfc3339()));
    output.push_str(&format!(
        "Duration: {}ms\n",
        (report.completed_at - report.started_at).num_milliseconds()
    ));
    output.push_str(&format!("State: {}\n\n", report.state));

    // Servers
    output.push_str("Servers\n-------\n");
    for server in &report.servers {
        let status = match &server.status {
            TaskStatus::Inspected { records } => format!("ok ({} records)", records),
            TaskStatus::Failed { phase, error } => format!("FAILED during {}: {}", phase, error),
            TaskStatus::TimedOut => "TIMED OUT".to_string(),
        };
        output.push_str(&format!(
            "{:<24} {:<10} {}\n",
            server.address(),
            server.backend.as_str(),
            status
        ));
    }
    output.push('\n');

    // Summary
    output.push_str("Summary\n-------\n");
    output.push_str(&format!("Servers: {}\n", report.servers.len()));
    output.push_str(&format!("Failed servers: {}\n", report.failed_servers().count()));
    output.push_str(&format!("Records: {}\n", report.total_records()));
    output.push_str(&format!("Pass: {}\n", report.count_status(CheckStatus::Pass)));
    output.push_str(&format!("Fail: {}\n", report.count_status(CheckStatus::Fail)));
    output.push_str(&format!("Survey: {}\n", report.count_status(CheckStatus::Survey)));

    if show_records && !report.records.is_empty() {
        output.push_str("\nRecords\n-------\n");
        for record in &report.records {
            output.push_str(&format!(
                "[{}] {} {}\n",
                record.status.to_string().to_uppercase(),
                record.server_ip,
                record.check_id
            ));
            for line in record.detail.lines() {
                output.push_str(&format!("    {}\n", line));
            }
        }
    }

    output
}

/// Format a run report as JSON
pub fn format_json(report: &RunReport, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(report).map_err(Into::into)
    } else {
        serde_json::to_string(report).map_err(Into::into)
    }
}
