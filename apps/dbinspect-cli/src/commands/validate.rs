//! Configuration validation command

use super::load_config;
use clap::Args;
use dbinspect_core::{AuditConfig, OutputFormat};
use serde_json::json;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Configuration file (YAML or JSON); defaults to the environment
    #[arg(long)]
    config: Option<PathBuf>,
}

pub fn run(args: ValidateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summarize(&config))?),
        OutputFormat::Text => print_text(&config),
    }

    Ok(())
}

fn print_text(config: &AuditConfig) {
    println!("Configuration OK: {} server(s)\n", config.servers.len());
    println!("{:<24} {:<10} {:<16} {}", "ADDRESS", "BACKEND", "USER", "KEYSPACE");
    for server in &config.servers {
        println!(
            "{:<24} {:<10} {:<16} {}",
            server.address(),
            server.backend_kind.as_str(),
            if server.username.is_empty() { "-" } else { server.username.as_str() },
            server.keyspace.as_deref().unwrap_or("-")
        );
    }

    if let Some(sink) = &config.sink {
        println!("\nSink: {} (table {})", sink.host, sink.table);
    }
}

/// Passwords are never included
fn summarize(config: &AuditConfig) -> serde_json::Value {
    let servers: Vec<_> = config
        .servers
        .iter()
        .map(|server| {
            json!({
                "ip": server.ip,
                "port": server.port,
                "backend": server.backend_kind.as_str(),
                "user": server.username,
                "has_password": !server.password.is_empty(),
                "keyspace": server.keyspace,
            })
        })
        .collect();

    json!({
        "servers": servers,
        "sink": config.sink.as_ref().map(|sink| json!({
            "host": sink.host,
            "table": sink.table,
        })),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbinspect_core::{BackendKind, ServerDescriptor};

    #[test]
    fn test_summary_omits_passwords() {
        let config = AuditConfig {
            servers: vec![
                ServerDescriptor::new("10.0.0.3", 9042, BackendKind::Cassandra)
                    .with_credentials("auditor", "hunter2")
                    .with_keyspace("system_auth"),
            ],
            sink: None,
        };

        let summary = summarize(&config);
        let text = summary.to_string();
        assert!(!text.contains("hunter2"));
        assert_eq!(summary["servers"][0]["backend"], "cassandra");
        assert_eq!(summary["servers"][0]["has_password"], true);
        assert_eq!(summary["servers"][0]["keyspace"], "system_auth");
        assert!(summary["sink"].is_null());
    }
}
