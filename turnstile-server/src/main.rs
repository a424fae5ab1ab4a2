//! Turnstile - session gatekeeper for reverse-proxy auth subrequests.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use turnstile_server::{AppState, Server, ServerConfig, shutdown_signal};

/// Session gatekeeper for reverse-proxy auth subrequests
#[derive(Parser)]
#[command(name = "turnstile")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "TURNSTILE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration file
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }

    let _guard = config.log.clone().init()?;

    info!(
        backend = ?config.store.backend,
        ttl_secs = config.session.ttl.as_secs(),
        "Starting turnstile"
    );

    let state = Arc::new(AppState::connect(&config).await?);
    let server = Server::bind(config.server.listen, state).await?;
    server.run(shutdown_signal()).await?;

    Ok(())
}
