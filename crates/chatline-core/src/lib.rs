//! chatline core - Shared domain types for the chat relay
//!
//! This crate provides the domain types shared between
//! the server (chatlined) and the client (chatline).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod connection;
pub mod credentials;
pub mod error;

// Re-exports for convenience
pub use connection::{ConnectionId, SessionState, Username};
pub use credentials::CredentialStore;
pub use error::{DomainError, DomainResult};
