//! Chopper
//!
//! Interactive helper that trims a local video without re-encoding, wraps it in
//! an optional intro and outro, and burns in an optional watermark.
//!
//! # Usage
//!
//! ```bash
//! chopper                      # prompt for runs
//! chopper run --input talk.mp4 --start 00:01:00 --end 00:02:00 --outro end.mov
//! chopper probe --input talk.mp4 --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use chopper_cli::adapters::{init_logging, AppConfig};
use chopper_cli::app::DefaultAppContainer;
use chopper_cli::cli::{commands, Cli, Commands};

/// Main entry point for the Chopper CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?
        .with_overrides(cli.output_root.clone(), cli.log_level.clone());

    // probing writes nothing, so it gets no diagnostic log
    let log_file = match cli.command {
        Some(Commands::Probe(_)) => None,
        _ => Some(config.log_file_path()),
    };
    init_logging(&config.log_level, log_file.as_deref())?;
    debug!("Configuration: {:?}", config);

    let quiet = matches!(&cli.command, Some(Commands::Run(args)) if args.json);
    let container = DefaultAppContainer::new(&config, quiet);

    match cli.command {
        None | Some(Commands::Interactive) => commands::interactive(&container, &config).await,
        Some(Commands::Run(args)) => commands::run(&container, &config, args).await,
        Some(Commands::Probe(args)) => commands::probe(&container, args).await,
    }
}
