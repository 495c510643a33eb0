//! Error types for the chat client.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use std::net::SocketAddr;

use chatline_protocol::CodecError;
use thiserror::Error;

// ============================================================================
// Client Error Type
// ============================================================================

/// Client errors.
///
/// Connection failures are fatal at startup. Errors after that end the
/// session the same way a server closure would.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Could not reach the server.
    ///
    /// Usually means nothing is listening at `addr`.
    #[error("Failed to connect to {addr}: {error}")]
    Connect { addr: SocketAddr, error: String },

    /// Console or socket I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A line could not be framed for the server.
    #[error("Framing error: {0}")]
    Codec(#[from] CodecError),

    /// The dispatcher task panicked or was cancelled.
    #[error("Dispatcher task failed: {0}")]
    Dispatcher(String),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
