//! dbinspect CLI
//!
//! Audits the security configuration of MongoDB, Redis and Cassandra
//! servers and writes the findings to a report.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dbinspect_core::OutputFormat;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// dbinspect - Database security configuration inspector
#[derive(Parser)]
#[command(name = "dbinspect")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Console output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// File that error events are appended to
    #[arg(long, global = true, default_value = "error_log.txt")]
    error_log: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect every configured server and persist the results
    Run(commands::run::RunArgs),

    /// Load and validate the configuration without connecting
    Validate(commands::validate::ValidateArgs),

    /// List supported backends and their checks
    Backends,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let error_log = match cli.command {
        Commands::Run(_) => Some(cli.error_log.as_path()),
        _ => None,
    };
    init_logging(cli.verbose, error_log)?;

    match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.format),
        Commands::Validate(args) => commands::validate::run(args, cli.format),
        Commands::Backends => commands::backends::run(cli.format),
    }
}

/// Console layer filtered by verbosity (or `RUST_LOG`), plus an optional
/// plain-text layer appending ERROR events to `error_log`
fn init_logging(verbose: bool, error_log: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let error_layer = match error_log {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open error log {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::ERROR),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .with(error_layer)
        .init();

    Ok(())
}
