//! chatline - Console chat client
//!
//! Connects to a chatline server, shows everything the server sends and
//! sends every typed line. Typing `exit` leaves the chat.
//!
//! # Usage
//!
//! ```text
//! chatline                          # connect to 127.0.0.1:1234
//! chatline --server 10.0.0.5:1234   # connect elsewhere
//! ```

use std::net::SocketAddr;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use chatline_client::{ChatClient, ClientConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

/// chatline client - join a chatline server from the console
#[derive(Parser, Debug)]
#[command(name = "chatline", version, about)]
struct Args {
    /// Server address to connect to
    #[arg(long, env = "CHATLINE_SERVER")]
    server: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Chat output owns stdout; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let mut config = ClientConfig::default();
    if let Some(server) = args.server {
        config.server_addr = server;
    }

    if let Err(e) = run(config).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }

    // The stdin reader thread stays blocked until the next console line,
    // and runtime shutdown would wait for it.
    process::exit(0);
}

async fn run(config: ClientConfig) -> Result<()> {
    let client = ChatClient::connect(&config)
        .await
        .context("Connection failed")?;
    debug!(server = %client.server_addr(), "Session starting");

    client
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("Chat session failed")?;
    Ok(())
}
