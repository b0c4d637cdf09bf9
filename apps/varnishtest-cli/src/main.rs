use varnishtest_cli::cli::Args;
use varnishtest_cli::error::CliError;
use varnishtest_cli::logger::initialize as LoggerInitialize;

use common::ErrorLocation;
use varnishtest::SupervisorConfig;

use std::fs::create_dir_all;
use std::panic::Location;

use clap::Parser;
use log::{error, info};

fn main() -> Result<(), CliError> {
    let args = Args::parse();

    let log_dir = args.log_dir();
    create_dir_all(&log_dir).map_err(|e| CliError::Cli {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;
    LoggerInitialize(&log_dir, args.log_level.into())?;

    info!("varnishtest starting");
    info!("Log directory: {}", log_dir.display());

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Cli {
            message: format!("Failed to build tokio runtime: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?
        .block_on(run(args))
}

async fn run(args: Args) -> Result<(), CliError> {
    let config = SupervisorConfig::load(&args.config).map_err(varnishtest::VarnishError::from)?;
    let builder = args.builder(config)?;

    let mut instance = builder.start().await?;

    // Scripts read this line.
    println!("{}", instance.base_url());
    info!(
        "Instance {} up (PID: {:?}), Ctrl-C to stop",
        instance.identity(),
        instance.pid()
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for Ctrl-C, shutting down: {e}");
    }

    instance.close().await;
    info!("varnishtest stopped");
    Ok(())
}
