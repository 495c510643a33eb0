//! Connection registry using Actor pattern.
//!
//! The registry holds every authenticated connection. It receives commands
//! via a tokio mpsc channel and is the only place membership is read or
//! changed, so register, deregister and broadcast never interleave.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ SessionHandler  │────▶│  RegistryActor  │────▶│ member writers  │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!         │                       │                       │
//!         │   RegistryCommand     │   BTreeMap<           │   relayed
//!         │   (mpsc channel)      │   ConnectionId,       │   lines
//!         ▼                       ▼   Member>             ▼
//!   Register/Deregister/     one command              every member
//!   Broadcast                at a time                but the sender
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use std::time::Duration;

use tokio::sync::mpsc;

mod actor;
mod commands;
mod handle;
mod membership;
mod peer;

pub use actor::RegistryActor;
pub use commands::{BroadcastReport, MemberView, RegistryCommand, RegistryError};
pub use handle::RegistryHandle;
pub use membership::Membership;
pub use peer::{
    peer_writer, shutdown_writer, write_text, BoxedWriter, PeerWriter, WriteError,
    DEFAULT_WRITE_TIMEOUT,
};

/// Command channel buffer size
const COMMAND_BUFFER: usize = 100;

/// Spawn the registry actor and return a handle for interaction.
///
/// Uses the default per-recipient write timeout.
///
/// # Example
///
/// ```no_run
/// use chatlined::registry::spawn_registry;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_registry();
///     let members = handle.members().await;
///     assert!(members.is_empty());
/// }
/// ```
pub fn spawn_registry() -> RegistryHandle {
    spawn_registry_with_timeout(DEFAULT_WRITE_TIMEOUT)
}

/// Spawn the registry actor with a custom per-recipient write timeout.
///
/// The actor stops once every handle has been dropped.
pub fn spawn_registry_with_timeout(write_timeout: Duration) -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = RegistryActor::new(cmd_rx, write_timeout);
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx)
}
