//! TCP connection and session orchestration for the chat client.
//!
//! This module provides the `ChatClient` which handles:
//! - Connecting to the server
//! - Running the input loop and the dispatcher side by side
//! - Ending the session once the server closes the connection
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinError;
use tracing::{debug, info};

use chatline_protocol::DEFAULT_PORT;

use crate::dispatcher::run_dispatcher;
use crate::error::{ClientError, Result};
use crate::input::run_input_loop;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the chat client.
///
/// # Example
///
/// ```rust
/// use chatline_client::ClientConfig;
///
/// let config = ClientConfig {
///     server_addr: "10.0.0.5:1234".parse().unwrap(),
/// };
/// assert_eq!(config.server_addr.port(), 1234);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server address to connect to.
    pub server_addr: SocketAddr,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
        }
    }
}

// ============================================================================
// Chat Client
// ============================================================================

/// A connected chat client.
///
/// There is no reconnection: once the server closes the connection the
/// session is over.
pub struct ChatClient {
    stream: TcpStream,
    server_addr: SocketAddr,
}

impl ChatClient {
    /// Connects to the configured server.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Connect` if the server cannot be reached.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let stream = TcpStream::connect(config.server_addr)
            .await
            .map_err(|e| ClientError::Connect {
                addr: config.server_addr,
                error: e.to_string(),
            })?;

        info!(server = %config.server_addr, "Connected to chat server");
        Ok(Self {
            stream,
            server_addr: config.server_addr,
        })
    }

    /// The server this client is connected to.
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Runs the session with `input` as the console and `output` as the screen.
    pub async fn run<I, O>(self, input: I, output: O) -> Result<()>
    where
        I: AsyncRead + Unpin,
        O: AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = self.stream.into_split();
        run_session(reader, writer, input, output).await
    }
}

/// Runs the input loop and the dispatcher over one connection.
///
/// The dispatcher runs as its own task. If the server closes first the
/// input loop is dropped; if the input loop finishes first the session
/// waits for the server to close, even when it stopped on an error.
/// Either way the session ends with the closure notice on `output`.
///
/// # Errors
///
/// Returns dispatcher errors. Input loop errors end the session like a
/// server closure does.
pub async fn run_session<R, W, I, O>(reader: R, writer: W, input: I, output: O) -> Result<()>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Unpin,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Send + Unpin + 'static,
{
    let mut dispatcher = tokio::spawn(run_dispatcher(reader, output));

    tokio::select! {
        input_result = run_input_loop(input, writer) => {
            match input_result {
                Ok(end) => debug!(end = ?end, "Input loop finished, waiting for server to close"),
                // Usually a write racing the server's close; the dispatcher
                // still owes the closure notice.
                Err(e) => debug!(error = %e, "Input loop failed, waiting for server to close"),
            }
            dispatcher_result(dispatcher.await)
        }

        joined = &mut dispatcher => {
            debug!("Server closed the connection");
            dispatcher_result(joined)
        }
    }
}

fn dispatcher_result(joined: std::result::Result<Result<u64>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result.map(|_| ()),
        Err(e) => Err(ClientError::Dispatcher(e.to_string())),
    }
}
