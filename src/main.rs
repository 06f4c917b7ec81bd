//! Main entry point for the clickup-time-export CLI

use clap::Parser;
use clickup_time_export::cli::{Cli, Commands};
use clickup_time_export::metrics::init_metrics;
use clickup_time_export::shutdown::{install_ctrl_c_handler, ShutdownCoordinator};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("clickup_time_export=info"));

    // stdout carries exported records
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(addr) = cli.metrics_addr {
        init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
    }

    let shutdown = ShutdownCoordinator::shared();
    install_ctrl_c_handler(shutdown.clone());

    match &cli.command {
        Commands::Export(args) => args.execute(&cli).await?,
        Commands::Refresh(args) => args.execute(&cli, shutdown).await?,
        Commands::Show(args) => args.execute(&cli)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}
