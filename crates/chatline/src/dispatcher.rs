//! Server-to-console dispatcher.
//!
//! Copies every chunk the server sends to the console unmodified. The
//! server's output is already line-oriented text, so no framing is applied
//! on this side.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::Result;

/// Printed once the server side of the connection is gone.
pub const CLOSED_NOTICE: &str = "Connection closed by server.\n";

/// Read chunk size
const READ_BUFFER_SIZE: usize = 1024;

/// Copies server output to `output` until the connection closes.
///
/// A read error counts as closure. Returns the number of bytes copied.
///
/// # Errors
///
/// Only console write failures are returned.
pub async fn run_dispatcher<R, O>(reader: R, mut output: O) -> Result<u64>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut chunks = ReaderStream::with_capacity(reader, READ_BUFFER_SIZE);
    let mut copied = 0u64;

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(bytes) => {
                output.write_all(&bytes).await?;
                output.flush().await?;
                copied += bytes.len() as u64;
            }
            Err(e) => {
                debug!(error = %e, "Server read failed, treating as closed");
                break;
            }
        }
    }

    output.write_all(CLOSED_NOTICE.as_bytes()).await?;
    output.flush().await?;
    debug!(bytes = copied, "Dispatcher finished");
    Ok(copied)
}
