//! CLI command implementations

pub mod backends;
pub mod run;
pub mod validate;

use anyhow::Context;
use dbinspect_core::AuditConfig;
use std::path::Path;

/// Load the configuration from `path`, or from the environment when no
/// file is given, and validate it
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AuditConfig> {
    let config = match path {
        Some(path) => AuditConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AuditConfig::from_env().context("no --config given and environment is incomplete")?,
    };
    config.validate()?;
    Ok(config)
}
