//! Subcommand handlers. Each returns `anyhow::Result` for `main` to report.

pub mod crd;
pub mod detect;
pub mod run;

use anyhow::{anyhow, Result};

use crate::cli::Cli;
use crate::config::{apply_env_overrides, load_config, ControllerConfig};

/// Layered configuration for a command: file, environment, then flags.
pub fn resolve_config(cli: &Cli) -> Result<ControllerConfig> {
    let config = load_config(cli.config.as_deref()).map_err(|e| anyhow!(e))?;
    let config = apply_env_overrides(config, |key| std::env::var(key).ok());
    let config = cli.apply_overrides(config);
    config
        .validate()
        .map_err(|errors| anyhow!("invalid configuration:\n  {}", errors.join("\n  ")))?;
    Ok(config)
}
