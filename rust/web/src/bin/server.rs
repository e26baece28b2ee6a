//! Standalone table server
//!
//! Usage: cargo run -p holdem_web --bin holdem-server -- --port 8080

use clap::Parser;
use holdem_web::{init_logging, AppSettings, WebServer};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "holdem-server", version, about = "Multiplayer Texas Hold'em table server")]
struct Cli {
    /// Host to bind to (overrides settings)
    #[arg(long)]
    host: Option<String>,
    /// Port to bind to (overrides settings)
    #[arg(short, long)]
    port: Option<u16>,
    /// TOML settings file (overrides HOLDEM_CONFIG)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let mut settings = AppSettings::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    settings.validate()?;

    init_logging(settings.log_json)?;
    tracing::info!(
        host = %settings.host,
        port = settings.port,
        starting_balance = settings.table.starting_balance,
        small_blind = settings.table.small_blind,
        big_blind = settings.table.big_blind,
        max_players = settings.table.max_players,
        "starting holdem server"
    );

    let handle = WebServer::new(&settings).start().await?;
    tracing::info!("server running at http://{}", handle.address());

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    handle.shutdown().await?;
    Ok(())
}
