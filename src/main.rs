//! vidshrink adaptive video compressor
//!
//! Compresses videos to the most efficient codec the playback target can
//! decode, with size-aware resolution and quality settings.
//!
//! # Usage
//!
//! ```bash
//! vidshrink compress --in holiday.mov
//! vidshrink compress --in ./videos --out ./small --quality fast --json
//! vidshrink plan --width 1920 --height 1080 --size-mb 80
//! vidshrink codecs
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use vidshrink::cli::{commands, Cli, Commands};
use vidshrink::config_initialization::initialize_configuration_hierarchy;
use vidshrink::utils::logging::init_logging;

/// Main entry point for the vidshrink CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = initialize_configuration_hierarchy(&cli)?;
    init_logging(&config.logging);
    debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Compress(args) => {
            info!("Executing compress command");
            commands::compress(args, config).await?;
        }
        Commands::Plan(args) => {
            info!("Executing plan command");
            commands::plan(args, config).await?;
        }
        Commands::Codecs(args) => {
            info!("Executing codecs command");
            commands::codecs(args, config).await?;
        }
    }

    Ok(())
}
