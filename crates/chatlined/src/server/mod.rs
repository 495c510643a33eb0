//! TCP server for the chat relay.
//!
//! The server:
//! - Listens on a TCP address for client connections
//! - Spawns a SessionHandler for each client
//! - Reaps finished sessions and logs a summary for each
//! - Supports shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │
//! │                 │
//! │  TcpListener    │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ SessionHandler  │────▶│  RegistryHandle │
//! │   (per client)  │     │                 │
//! └─────────────────┘     └─────────────────┘
//!                                 │
//!                                 │ broadcast
//!                                 ▼
//!                         ┌─────────────────┐
//!                         │ other members   │
//!                         └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Accept errors are logged and allow continued operation

mod session;

pub use session::{CloseReason, SessionError, SessionHandler, SessionSettings, SessionSummary};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use chatline_core::{ConnectionId, CredentialStore, Username};

use crate::config::ServerConfig;
use crate::registry::RegistryHandle;

/// TCP server for the chat relay.
///
/// Owns the listener; every accepted connection runs in its own task.
pub struct ChatServer {
    /// Bound listener
    listener: TcpListener,

    /// Handle to the connection registry
    registry: RegistryHandle,

    /// Accounts allowed to log in
    credentials: Arc<CredentialStore>,

    /// Limits applied to every session
    settings: SessionSettings,

    /// Cancellation token for shutdown
    cancel_token: CancellationToken,

    /// Connection counter for generating connection ids
    connection_counter: AtomicU64,
}

impl ChatServer {
    /// Binds a server to `addr`.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to listen on; port 0 picks a free port
    /// * `registry` - Handle to the connection registry
    /// * `credentials` - Accounts allowed to log in
    /// * `settings` - Per-session limits
    /// * `cancel_token` - Token for shutdown
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if the address cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        registry: RegistryHandle,
        credentials: Arc<CredentialStore>,
        settings: SessionSettings,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr,
                error: e.to_string(),
            })?;

        Ok(Self {
            listener,
            registry,
            credentials,
            settings,
            cancel_token,
            connection_counter: AtomicU64::new(1),
        })
    }

    /// Binds a server using the listen address, limits and credentials of `config`.
    pub async fn from_config(
        config: &ServerConfig,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        Self::bind(
            config.listen,
            registry,
            Arc::new(config.credentials.clone()),
            config.session_settings(),
            cancel_token,
        )
        .await
    }

    /// Returns the address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::LocalAddr(e.to_string()))
    }

    /// Runs the server.
    ///
    /// Accepts connections until the cancellation token is triggered, then
    /// aborts the remaining sessions. Their registry memberships are
    /// released as the tasks drop.
    pub async fn run(&self) {
        match self.listener.local_addr() {
            Ok(addr) => info!(addr = %addr, "Chat server listening"),
            Err(e) => debug!(error = %e, "Listening on unknown address"),
        }

        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let id = ConnectionId::new(
                                self.connection_counter.fetch_add(1, Ordering::Relaxed),
                            );
                            self.spawn_session(&mut sessions, stream, peer, id);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Keep accepting; one bad accept must not stop the server
                        }
                    }
                }

                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    log_session_end(joined);
                }
            }
        }

        self.cleanup(&mut sessions).await;
    }

    /// Spawns the session task for a freshly accepted connection.
    fn spawn_session(
        &self,
        sessions: &mut JoinSet<SessionSummary>,
        stream: TcpStream,
        peer: SocketAddr,
        id: ConnectionId,
    ) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(connection = %id, error = %e, "Failed to set TCP_NODELAY");
        }

        let (reader, writer) = stream.into_split();
        let handler = SessionHandler::new(
            id,
            reader,
            writer,
            self.registry.clone(),
            Arc::clone(&self.credentials),
            self.settings,
        );

        info!(connection = %id, peer = %peer, "Accepted connection");
        sessions.spawn(handler.run());
    }

    /// Performs cleanup on shutdown.
    async fn cleanup(&self, sessions: &mut JoinSet<SessionSummary>) {
        let remaining = sessions.len();
        sessions.shutdown().await;
        info!(aborted_sessions = remaining, "Server cleanup complete");
    }
}

/// Logs the outcome of a finished session task.
fn log_session_end(joined: Result<SessionSummary, JoinError>) {
    match joined {
        Ok(summary) => {
            info!(
                connection = %summary.id,
                username = summary.username.as_ref().map(Username::as_str).unwrap_or("-"),
                registered = summary.registered,
                relayed = summary.relayed,
                reason = %summary.reason,
                "Client disconnected"
            );
        }
        Err(e) if e.is_cancelled() => {
            debug!("Session task cancelled");
        }
        Err(e) => {
            error!(error = %e, "Session task panicked");
        }
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },

    #[error("Failed to read local address: {0}")]
    LocalAddr(String),
}
