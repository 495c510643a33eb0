//! Session handler for individual client connections.
//!
//! Each accepted connection gets its own `SessionHandler` that:
//! - Prompts for a username and password
//! - Checks them against the credential store
//! - Registers the connection and relays its chat lines to other members
//! - Deregisters and closes the transport when the session ends
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Transport errors end the session; they never reach the accept loop

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use chatline_core::{ConnectionId, CredentialStore, SessionState, Username};
use chatline_protocol::{
    trim_line, ChatLineCodec, ClientLine, CodecError, ServerLine, DEFAULT_MAX_LINE_LENGTH,
};

use crate::registry::{
    peer_writer, shutdown_writer, write_text, Membership, PeerWriter, RegistryError,
    RegistryHandle, WriteError, DEFAULT_WRITE_TIMEOUT,
};

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Longest accepted line in bytes
    pub max_line_length: usize,

    /// Bound on each write to this client
    pub write_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Why a session reached `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the transport
    Disconnected,

    /// Client sent `exit`
    ExitCommand,

    /// Wrong username or password
    AuthenticationFailed,

    /// Read error, oversized line, or invalid UTF-8
    ReadFailed,

    /// Write error or timeout
    WriteFailed,

    /// Registry actor unavailable or rejected the registration
    RegistryUnavailable,
}

impl CloseReason {
    /// Returns the display label for this reason.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::ExitCommand => "exit command",
            Self::AuthenticationFailed => "authentication failed",
            Self::ReadFailed => "read failed",
            Self::WriteFailed => "write failed",
            Self::RegistryUnavailable => "registry unavailable",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&SessionError> for CloseReason {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::Read(_) => Self::ReadFailed,
            SessionError::Write(_) => Self::WriteFailed,
            SessionError::Registry(_) => Self::RegistryUnavailable,
        }
    }
}

/// What a finished session reports back to the accept loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Connection id
    pub id: ConnectionId,

    /// Authenticated name, if login succeeded
    pub username: Option<Username>,

    /// Whether the connection was ever in the registry
    pub registered: bool,

    /// Number of chat lines broadcast
    pub relayed: u64,

    /// Why the session ended
    pub reason: CloseReason,
}

/// Session handler for a single client.
///
/// Drives `Connected -> AwaitingUsername -> AwaitingPassword -> Active ->
/// Closed`. Every path out of `drive` ends in `close`, which releases the
/// transport; registry membership is held by a `Membership` guard.
pub struct SessionHandler<R> {
    /// Connection id
    id: ConnectionId,

    /// Framed reader yielding trimmed lines
    reader: FramedRead<R, ChatLineCodec>,

    /// Write endpoint, shared with the registry once active
    writer: PeerWriter,

    /// Handle to the connection registry
    registry: RegistryHandle,

    /// Accounts allowed to log in
    credentials: Arc<CredentialStore>,

    /// Bound on each write
    write_timeout: Duration,

    /// Current lifecycle state
    state: SessionState,

    /// Set once, on successful login
    username: Option<Username>,

    /// Whether registration happened
    registered: bool,

    /// Chat lines broadcast so far
    relayed: u64,
}

impl<R> SessionHandler<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a new session handler.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique id for this connection
    /// * `reader` - Read half of the transport
    /// * `writer` - Write half of the transport
    /// * `registry` - Handle to the connection registry
    /// * `credentials` - Accounts allowed to log in
    /// * `settings` - Line length and write timeout limits
    pub fn new<W>(
        id: ConnectionId,
        reader: R,
        writer: W,
        registry: RegistryHandle,
        credentials: Arc<CredentialStore>,
        settings: SessionSettings,
    ) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id,
            reader: FramedRead::new(
                reader,
                ChatLineCodec::with_max_length(settings.max_line_length),
            ),
            writer: peer_writer(writer),
            registry,
            credentials,
            write_timeout: settings.write_timeout,
            state: SessionState::Connected,
            username: None,
            registered: false,
            relayed: 0,
        }
    }

    /// Runs the session to completion.
    ///
    /// Never fails: errors are folded into the summary's `reason`.
    pub async fn run(mut self) -> SessionSummary {
        debug!(connection = %self.id, "New client connected");

        let reason = match self.drive().await {
            Ok(reason) => reason,
            Err(e) => {
                debug!(connection = %self.id, error = %e, "Session ended by error");
                CloseReason::from(&e)
            }
        };

        self.close().await;

        SessionSummary {
            id: self.id,
            username: self.username,
            registered: self.registered,
            relayed: self.relayed,
            reason,
        }
    }

    /// Login followed by the relay loop.
    async fn drive(&mut self) -> Result<CloseReason, SessionError> {
        self.transition(SessionState::AwaitingUsername);
        self.send(&ServerLine::UsernamePrompt).await?;
        let Some(candidate) = self.next_line().await? else {
            return Ok(CloseReason::Disconnected);
        };

        self.transition(SessionState::AwaitingPassword);
        self.send(&ServerLine::PasswordPrompt).await?;
        let Some(password) = self.next_line().await? else {
            return Ok(CloseReason::Disconnected);
        };

        if !self.credentials.verify(&candidate, &password) {
            warn!(
                connection = %self.id,
                username = %candidate,
                known_user = self.credentials.contains_user(&candidate),
                "Authentication failed"
            );
            if let Err(e) = self.send(&ServerLine::AuthenticationFailed).await {
                debug!(connection = %self.id, error = %e, "Could not deliver failure notice");
            }
            return Ok(CloseReason::AuthenticationFailed);
        }

        self.send(&ServerLine::AuthenticationSucceeded).await?;

        let username = Username::from(candidate);
        let membership = Membership::acquire(
            self.registry.clone(),
            self.id,
            username.clone(),
            Arc::clone(&self.writer),
        )
        .await?;
        self.username = Some(username.clone());
        self.registered = true;
        self.transition(SessionState::Active);
        info!(connection = %self.id, username = %username, "Client authenticated");

        let result = self.relay_loop(&username).await;
        membership.release().await;
        result
    }

    /// Reads chat lines and broadcasts them until exit or disconnect.
    async fn relay_loop(&mut self, username: &Username) -> Result<CloseReason, SessionError> {
        loop {
            let Some(line) = self.next_line().await? else {
                return Ok(CloseReason::Disconnected);
            };

            let text = match ClientLine::parse(&line) {
                ClientLine::Exit => {
                    debug!(connection = %self.id, "Client requested disconnect");
                    return Ok(CloseReason::ExitCommand);
                }
                ClientLine::Chat(text) => text,
            };

            let message = ServerLine::relay(username.clone(), text).to_wire();
            info!(connection = %self.id, from = %username, "{}", trim_line(&message));

            let report = self.registry.broadcast(message, self.id).await?;
            self.relayed += 1;

            if !report.failed.is_empty() {
                debug!(
                    connection = %self.id,
                    delivered = report.delivered.len(),
                    failed = report.failed.len(),
                    "Relay partially failed"
                );
            }
        }
    }

    /// Enters `Closed` and shuts the write side down.
    async fn close(&mut self) {
        self.transition(SessionState::Closed);
        shutdown_writer(&self.writer, self.write_timeout).await;
    }

    /// Reads the next trimmed line; `None` once the peer has closed.
    async fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        match self.reader.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(SessionError::Read(e)),
            None => Ok(None),
        }
    }

    /// Writes one server line to this client.
    async fn send(&self, line: &ServerLine) -> Result<(), SessionError> {
        write_text(&self.writer, &line.to_wire(), self.write_timeout).await?;
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            warn!(
                connection = %self.id,
                from = %self.state,
                to = %next,
                "Unexpected session state transition"
            );
        }
        debug!(connection = %self.id, from = %self.state, to = %next, "Session state change");
        self.state = next;
    }
}

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Read failed: {0}")]
    Read(#[from] CodecError),

    #[error("Write failed: {0}")]
    Write(#[from] WriteError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}
