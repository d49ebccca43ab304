//! beatbridge - WebSocket to UDP relay for the beatbox backend

use anyhow::Result;
use beatbridge::config::Config;
use beatbridge::server::{shutdown_on, ServerListener};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "beatbridge")]
#[command(about = "Relay commands from WebSocket clients to a UDP backend and broadcast its status")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to accept client connections on
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Backend host
    #[arg(long)]
    backend_host: Option<String>,

    /// Backend UDP port
    #[arg(long)]
    backend_port: Option<u16>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        config.apply_overrides(self.listen, self.backend_host.clone(), self.backend_port);
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    let server = ServerListener::bind(config).await?;

    let shutdown_rx = shutdown_on(tokio::signal::ctrl_c());
    server.run(shutdown_rx).await
}
