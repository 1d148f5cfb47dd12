//! Inspection run command

use super::load_config;
use anyhow::bail;
use clap::{ArgGroup, Args};
use dbinspect_core::{
    AuditConfig, InspectError, OutputFormat, ProgressReporter, ResultSink, RunState,
    ServerDescriptor,
};
use dbinspect_engine::{format_json, format_text, Orchestrator, OrchestratorConfig};
use dbinspect_inspectors::{DriverConnector, DriverOptions};
use dbinspect_sinks::{CsvSink, JsonSink, SqliteSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

#[derive(Args)]
#[command(group(ArgGroup::new("sink").args(["csv", "database", "json"])))]
pub struct RunArgs {
    /// Append results to a CSV report
    #[arg(short, long)]
    csv: bool,

    /// Insert results into the configured SQLite table
    #[arg(short, long)]
    database: bool,

    /// Write results to a JSON report
    #[arg(short, long)]
    json: bool,

    /// Report file name without extension
    #[arg(short, long, default_value = "inspection_results", conflicts_with = "database")]
    file: String,

    /// Configuration file (YAML or JSON); defaults to the SERVERS and
    /// DB_SERVERS environment variables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Deadline for the whole run, in seconds; servers still running then
    /// are reported as timed out
    #[arg(long)]
    timeout: Option<u64>,

    /// Connection timeout per server, in seconds
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,
}

pub fn run(args: RunArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let sink = build_sink(&args, &config)?;

    if format == OutputFormat::Text {
        println!("dbinspect Security Inspection");
        println!("=============================\n");
    }

    let connector = DriverConnector::new().with_options(DriverOptions {
        connect_timeout: Duration::from_secs(args.connect_timeout),
    });

    let mut orchestrator = Orchestrator::new(Arc::new(connector))
        .with_config(OrchestratorConfig {
            run_deadline: args.timeout.map(Duration::from_secs),
        })
        .with_progress(Arc::new(ConsoleProgress));

    let report = orchestrator.run(&config.servers);

    match format {
        OutputFormat::Json => println!("{}", format_json(&report, true)?),
        OutputFormat::Text => println!("{}", format_text(&report, false)),
    }

    let mut sink_failed = false;
    if let Some(sink) = sink {
        match sink.persist(&report.records) {
            Ok(()) => eprintln!("Results written by {} sink", sink.name()),
            Err(e) => {
                error!(sink = sink.name(), phase = e.phase(), error = %e, "Failed to persist results");
                eprintln!("Error: failed to persist results: {}", e);
                sink_failed = true;
            }
        }
    }

    // Exit with error code if any server or the sink failed
    if sink_failed || report.state == RunState::PartiallyFailed {
        std::process::exit(1);
    }

    Ok(())
}

/// Pick the sink selected on the command line; `None` prints only
fn build_sink(args: &RunArgs, config: &AuditConfig) -> anyhow::Result<Option<Box<dyn ResultSink>>> {
    if args.csv {
        return Ok(Some(Box::new(CsvSink::new(format!("{}.csv", args.file)))));
    }
    if args.json {
        return Ok(Some(Box::new(JsonSink::new(format!("{}.json", args.file)))));
    }
    if args.database {
        let Some(credentials) = &config.sink else {
            bail!("--database needs sink credentials (config `sink` section or DB_SERVERS)");
        };
        return Ok(Some(Box::new(SqliteSink::from_credentials(credentials)?)));
    }
    Ok(None)
}

/// Progress lines on stderr so JSON output on stdout stays parseable
struct ConsoleProgress;

impl ProgressReporter for ConsoleProgress {
    fn dispatch_started(&self, servers: usize) {
        eprintln!("Inspecting {} server(s)...", servers);
    }

    fn server_started(&self, _server: &ServerDescriptor) {}

    fn server_completed(&self, server: &ServerDescriptor, records: usize) {
        eprintln!(
            "  [ok]   {} ({}): {} records",
            server.address(),
            server.backend_kind,
            records
        );
    }

    fn server_failed(&self, server: &ServerDescriptor, error: &InspectError) {
        eprintln!(
            "  [fail] {} ({}): {}",
            server.address(),
            server.backend_kind,
            error
        );
    }

    fn run_completed(&self, total_records: usize) {
        eprintln!("Collected {} records\n", total_records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use dbinspect_core::{BackendKind, SinkCredentials};

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RunArgs,
    }

    fn args(flags: &[&str]) -> RunArgs {
        let argv = std::iter::once("run").chain(flags.iter().copied());
        Harness::try_parse_from(argv).unwrap().args
    }

    fn config(sink: Option<SinkCredentials>) -> AuditConfig {
        AuditConfig {
            servers: vec![ServerDescriptor::new("10.0.0.1", 6379, BackendKind::Redis)],
            sink,
        }
    }

    #[test]
    fn test_no_flag_means_no_sink() {
        assert!(build_sink(&args(&[]), &config(None)).unwrap().is_none());
    }

    #[test]
    fn test_file_sinks_use_base_name() {
        let sink = build_sink(&args(&["-c", "-f", "nightly"]), &config(None))
            .unwrap()
            .unwrap();
        assert_eq!(sink.name(), "csv");

        let sink = build_sink(&args(&["--json"]), &config(None)).unwrap().unwrap();
        assert_eq!(sink.name(), "json");
    }

    #[test]
    fn test_database_requires_credentials() {
        assert!(build_sink(&args(&["-d"]), &config(None)).is_err());

        let dir = tempfile::tempdir().unwrap();
        let credentials = SinkCredentials {
            host: dir.path().join("audit.db").display().to_string(),
            user: String::new(),
            password: String::new(),
            table: "db_insp_result".to_string(),
        };
        let sink = build_sink(&args(&["-d"]), &config(Some(credentials)))
            .unwrap()
            .unwrap();
        assert_eq!(sink.name(), "sqlite");
    }

    #[test]
    fn test_timeouts_parse() {
        let parsed = args(&["--timeout", "30", "--connect-timeout", "3"]);
        assert_eq!(parsed.timeout, Some(30));
        assert_eq!(parsed.connect_timeout, 3);
        assert_eq!(parsed.file, "inspection_results");
    }
}
