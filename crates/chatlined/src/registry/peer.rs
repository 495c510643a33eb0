//! Shared write endpoint of one connection.
//!
//! The session handler writes prompts through it and, once the connection
//! is registered, the registry writes relayed lines through the same
//! handle. The mutex keeps the two from interleaving bytes.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Default bound on a single write (10 seconds)
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Type-erased transport write half.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Type alias for a connection's shared writer handle
pub type PeerWriter = Arc<Mutex<BufWriter<BoxedWriter>>>;

/// Wraps a transport write half into a shareable handle.
pub fn peer_writer<W>(writer: W) -> PeerWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let boxed: BoxedWriter = Box::new(writer);
    Arc::new(Mutex::new(BufWriter::new(boxed)))
}

/// Errors from writing to a peer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Write timeout")]
    Timeout,
}

/// Writes `text` and flushes, giving up after `limit`.
pub async fn write_text(writer: &PeerWriter, text: &str, limit: Duration) -> Result<(), WriteError> {
    let mut writer = writer.lock().await;

    match timeout(limit, async {
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        Ok::<(), std::io::Error>(())
    })
    .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WriteError::Io(e.to_string())),
        Err(_) => Err(WriteError::Timeout),
    }
}

/// Flushes and shuts down the write side. Errors are ignored: the
/// connection is going away either way.
pub async fn shutdown_writer(writer: &PeerWriter, limit: Duration) {
    let mut writer = writer.lock().await;
    let _ = timeout(limit, writer.shutdown()).await;
}
