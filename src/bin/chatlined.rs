//! chatlined - Chat relay server
//!
//! Accepts TCP clients, asks each for a username and password, and relays
//! every chat line an authenticated client sends to all other
//! authenticated clients.
//!
//! # Usage
//!
//! ```bash
//! # Listen on 0.0.0.0:1234 with the built-in accounts
//! chatlined
//!
//! # Use a config file and a different address
//! chatlined --config ./chatlined.toml --listen 127.0.0.1:4000
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chatlined::config::ServerConfig;
use chatlined::registry::spawn_registry_with_timeout;
use chatlined::server::ChatServer;

/// chatline server - line-oriented chat relay with password login
#[derive(Parser, Debug)]
#[command(name = "chatlined", version, about)]
struct Args {
    /// Config file (TOML); defaults to the user config directory
    #[arg(long, env = "CHATLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file
    #[arg(long, env = "CHATLINE_LISTEN")]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("chatlined=info".parse()?)
                .add_directive("chatline_core=info".parse()?)
                .add_directive("chatline_protocol=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "chatline server starting"
    );

    let mut config =
        ServerConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(listen) = args.listen {
        config = config.with_listen(listen);
    }
    config.validate().context("Invalid configuration")?;

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let registry = spawn_registry_with_timeout(config.write_timeout());
    info!(accounts = config.credentials.len(), "Connection registry started");

    let server = ChatServer::from_config(&config, registry, cancel_token)
        .await
        .context("Failed to start server")?;
    let addr = server.local_addr()?;

    println!("Chat server started on port {}", addr.port());

    server.run().await;

    info!("chatline server stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
