//! Console input loop.
//!
//! Reads console lines and sends each to the server as one
//! newline-terminated line. The loop stops right after sending `exit`, or
//! when the console reaches EOF.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use futures::SinkExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio_util::codec::FramedWrite;
use tracing::debug;

use chatline_protocol::{ChatLineCodec, ClientLine};

use crate::error::Result;

/// Why the input loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEnd {
    /// `exit` was sent
    Exit,

    /// Console closed without `exit`
    Eof,
}

/// Forwards console lines to the server.
///
/// On return the server write half has been shut down, which tells the
/// server no more lines are coming.
///
/// # Errors
///
/// Returns console read errors and server write errors.
pub async fn run_input_loop<I, W>(input: I, writer: W) -> Result<InputEnd>
where
    I: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut sink = FramedWrite::new(writer, ChatLineCodec::new());

    let end = loop {
        let Some(line) = lines.next_line().await? else {
            debug!("Console closed");
            break InputEnd::Eof;
        };

        let is_exit = matches!(ClientLine::parse(&line), ClientLine::Exit);
        sink.send(line).await?;

        if is_exit {
            debug!("Exit sent");
            break InputEnd::Exit;
        }
    };

    // The server may already be gone; nothing left to report then.
    if let Err(e) = SinkExt::<String>::close(&mut sink).await {
        debug!(error = %e, "Failed to shut down server write half");
    }

    Ok(end)
}
