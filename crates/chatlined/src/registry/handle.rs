//! Client interface for interacting with the RegistryActor.
//!
//! The `RegistryHandle` provides a cheap-to-clone interface for sending
//! commands to the registry actor.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel errors are mapped to `RegistryError::ChannelClosed`

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use chatline_core::{ConnectionId, Username};

use super::commands::{BroadcastReport, MemberView, RegistryCommand, RegistryError};
use super::peer::PeerWriter;

// ============================================================================
// Registry Handle
// ============================================================================

/// Handle for interacting with the registry actor.
///
/// This is a cheap-to-clone handle that can be shared across tasks.
/// All methods are async and communicate with the actor via channels.
///
/// # Usage
///
/// ```ignore
/// let handle = registry_handle.clone();
///
/// handle.register(id, username, writer).await?;
/// let report = handle.broadcast("user1: hi\n".to_string(), id).await?;
/// handle.deregister(id).await?;
/// ```
#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Create a new registry handle.
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Add an authenticated connection to the member set.
    ///
    /// # Errors
    ///
    /// - `RegistryError::AlreadyRegistered` if the id is already a member
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn register(
        &self,
        id: ConnectionId,
        username: Username,
        writer: PeerWriter,
    ) -> Result<(), RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Register {
                id,
                username,
                writer,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Remove a connection from the member set.
    ///
    /// Safe to call for ids that are not (or no longer) registered.
    /// Returns whether an entry was removed.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn deregister(&self, id: ConnectionId) -> Result<bool, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Deregister {
                id,
                respond_to: Some(tx),
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Queue a removal without waiting for it.
    ///
    /// Usable from synchronous contexts such as `Drop`. If the command
    /// queue is momentarily full the send is moved onto a task.
    pub fn deregister_detached(&self, id: ConnectionId) {
        let cmd = RegistryCommand::Deregister {
            id,
            respond_to: None,
        };

        match self.sender.try_send(cmd) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Actor gone; nothing left to remove from.
            }
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        let sender = self.sender.clone();
                        runtime.spawn(async move {
                            let _ = sender.send(cmd).await;
                        });
                    }
                    Err(_) => {
                        warn!(connection = %id, "No runtime available, member removal dropped");
                    }
                }
            }
        }
    }

    /// Write `message` to every member except `exclude`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn broadcast(
        &self,
        message: String,
        exclude: ConnectionId,
    ) -> Result<BroadcastReport, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Broadcast {
                message,
                exclude,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Get a snapshot of all members, ordered by connection id.
    ///
    /// Returns an empty vector if communication with the actor fails.
    pub async fn members(&self) -> Vec<MemberView> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Members { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Number of registered members (0 if the actor is gone).
    pub async fn member_count(&self) -> usize {
        self.members().await.len()
    }

    /// Returns true if the member set contains `id`.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.members().await.iter().any(|m| m.id == id)
    }

    /// Check if the actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
