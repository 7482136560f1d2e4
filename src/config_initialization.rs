//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::TomlConfigAdapter;
use crate::cli::{Cli, Commands};
use crate::config::CompressorConfig;

/// Build the effective configuration: Defaults < File < Env < CLI
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<CompressorConfig> {
    let mut config = TomlConfigAdapter::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let overrides = apply_cli_configuration_overrides(&mut config, cli);
    if overrides > 0 {
        info!("Applied {} CLI configuration overrides", overrides);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Apply CLI argument overrides to configuration
fn apply_cli_configuration_overrides(config: &mut CompressorConfig, cli: &Cli) -> usize {
    let mut cli_overrides = 0;

    if let Some(level) = cli.log_level {
        config.logging.level = level;
        cli_overrides += 1;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
        cli_overrides += 1;
    }

    if let Commands::Compress(args) = &cli.command {
        if let Some(threads) = args.threads {
            config.engine.threads = threads;
            cli_overrides += 1;
        }
    }

    cli_overrides
}
