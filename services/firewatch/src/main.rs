//! Firewatch CLI
//!
//! Command-line interface for the fire-alert telemetry monitoring service.

use std::path::PathBuf;

use clap::Parser;
use firewatch::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "firewatch")]
#[command(about = "Fire-alert telemetry monitoring and reporting service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device to monitor (overrides config file)
    #[arg(short, long)]
    device: Option<String>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(device) = args.device {
        config.source.device_id = Some(device);
    }
    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    tracing::info!("Starting firewatch service");
    tracing::debug!(
        "Source: {}, device poll: {}s, reading poll: {}s, archive: {}",
        config.source.base_url,
        config.source.device_poll_seconds,
        config.source.reading_poll_seconds,
        config.archive_path
    );

    firewatch::run(config).await?;

    Ok(())
}
