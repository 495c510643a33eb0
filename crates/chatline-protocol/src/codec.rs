//! Newline framing for chat lines.
//!
//! `ChatLineCodec` buffers bytes until a `\n` arrives, so a line split
//! across several reads is reassembled and several lines delivered in one
//! read come out one at a time. Lines over the configured maximum are
//! reported as an error instead of being truncated.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Default maximum line length in bytes, excluding the terminator.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Errors produced while framing lines.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Line exceeds maximum length of {max} bytes")]
    LineTooLong { max: usize },

    #[error("Line is not valid UTF-8")]
    InvalidUtf8,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Strips every trailing `\r` and `\n` from a line.
///
/// Leading whitespace and interior characters are left untouched.
pub fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Length of a line without the `\r` of a CRLF terminator.
fn content_len(line: &[u8]) -> usize {
    match line.last() {
        Some(b'\r') => line.len() - 1,
        _ => line.len(),
    }
}

/// Codec turning a byte stream into trimmed text lines and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatLineCodec {
    max_length: usize,

    /// Offset already scanned for a newline, so repeated `decode` calls
    /// on a growing buffer do not rescan from the start.
    next_index: usize,
}

impl ChatLineCodec {
    /// Creates a codec with the default maximum line length.
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Creates a codec that rejects lines longer than `max_length` bytes.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }

    /// Returns the maximum accepted line length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn take_line(
        &mut self,
        buf: &mut BytesMut,
        content_len: usize,
        consumed: usize,
    ) -> Result<String, CodecError> {
        self.next_index = 0;
        let frame = buf.split_to(consumed);
        let content = frame.get(..content_len).unwrap_or_default();
        let text = std::str::from_utf8(content).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(trim_line(text).to_string())
    }
}

impl Default for ChatLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChatLineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
        let start = self.next_index.min(buf.len());
        let newline = buf
            .get(start..)
            .and_then(|rest| rest.iter().position(|b| *b == b'\n'))
            .map(|offset| start + offset);

        match newline {
            Some(end) => {
                let content = buf.get(..end).map_or(end, content_len);
                if content > self.max_length {
                    buf.advance(end + 1);
                    self.next_index = 0;
                    return Err(CodecError::LineTooLong {
                        max: self.max_length,
                    });
                }
                self.take_line(buf, end, end + 1).map(Some)
            }
            None => {
                if content_len(&buf[..]) > self.max_length {
                    return Err(CodecError::LineTooLong {
                        max: self.max_length,
                    });
                }
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        // Peer closed mid-line: hand over the unterminated fragment.
        let len = buf.len();
        self.take_line(buf, len, len).map(Some)
    }
}

impl Encoder<&str> for ChatLineCodec {
    type Error = CodecError;

    fn encode(&mut self, line: &str, dst: &mut BytesMut) -> Result<(), CodecError> {
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        if !line.ends_with('\n') {
            dst.put_u8(b'\n');
        }
        Ok(())
    }
}

impl Encoder<String> for ChatLineCodec {
    type Error = CodecError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), CodecError> {
        Encoder::<&str>::encode(self, line.as_str(), dst)
    }
}
