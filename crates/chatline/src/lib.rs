//! chatline client - Library modules
//!
//! This library provides the pieces of the console chat client.
//!
//! # Architecture
//!
//! The client runs two concurrent tasks over one TCP connection:
//!
//! 1. **Input Loop**: Reads console lines and sends each to the server,
//!    stopping after `exit` or console EOF
//! 2. **Dispatcher**: Copies everything the server sends to the console,
//!    then prints a closure notice
//!
//! The session ends once the server closes the connection.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod input;

// Re-export commonly used types
pub use client::{run_session, ChatClient, ClientConfig};
pub use dispatcher::{run_dispatcher, CLOSED_NOTICE};
pub use error::{ClientError, Result};
pub use input::{run_input_loop, InputEnd};
