//! Scoped registry membership.
//!
//! A `Membership` exists exactly while its connection is registered.
//! Session handlers release it explicitly on their way out; if a handler
//! task is aborted or unwinds instead, `Drop` queues the removal so the
//! registry never keeps a member whose handler is gone.

use tracing::debug;

use chatline_core::{ConnectionId, Username};

use super::commands::RegistryError;
use super::handle::RegistryHandle;
use super::peer::PeerWriter;

/// Proof that a connection is currently in the registry.
pub struct Membership {
    id: ConnectionId,
    registry: RegistryHandle,
    released: bool,
}

impl Membership {
    /// Registers the connection and returns the guard for it.
    ///
    /// # Errors
    ///
    /// Propagates registration errors; no guard is created in that case.
    pub async fn acquire(
        registry: RegistryHandle,
        id: ConnectionId,
        username: Username,
        writer: PeerWriter,
    ) -> Result<Self, RegistryError> {
        registry.register(id, username, writer).await?;
        Ok(Self {
            id,
            registry,
            released: false,
        })
    }

    /// Deregisters and waits for the registry to confirm.
    ///
    /// Returns whether the entry was still present.
    pub async fn release(mut self) -> bool {
        self.released = true;
        match self.registry.deregister(self.id).await {
            Ok(removed) => removed,
            Err(e) => {
                debug!(connection = %self.id, error = %e, "Registry gone during release");
                false
            }
        }
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        if !self.released {
            debug!(connection = %self.id, "Membership dropped without release, deregistering");
            self.registry.deregister_detached(self.id);
        }
    }
}
