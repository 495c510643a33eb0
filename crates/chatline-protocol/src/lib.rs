//! chatline protocol - Wire format for the chat relay
//!
//! Everything on the wire is newline-terminated UTF-8 text. This crate
//! provides the line framer used on both ends of a connection and the
//! fixed server lines (prompts, login results, relayed chat).

pub mod codec;
pub mod message;

pub use codec::{trim_line, ChatLineCodec, CodecError, DEFAULT_MAX_LINE_LENGTH};
pub use message::{ClientLine, ServerLine, DEFAULT_PORT, EXIT_COMMAND};
