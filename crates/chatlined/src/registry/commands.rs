//! Registry actor commands, errors, and reports.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `BroadcastReport` / `MemberView`: Results handed back to callers

use std::fmt;

use chatline_core::{ConnectionId, Username};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::oneshot;

use super::peer::PeerWriter;

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// The actor handles them strictly one at a time, so a broadcast never
/// observes the member set halfway through an insert or a removal.
pub enum RegistryCommand {
    /// Add an authenticated connection.
    ///
    /// # Errors
    /// - `RegistryError::AlreadyRegistered` if the id is already present
    Register {
        /// Connection being added
        id: ConnectionId,
        /// Name it authenticated as
        username: Username,
        /// Write endpoint used for relays
        writer: PeerWriter,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<(), RegistryError>>,
    },

    /// Remove a connection. Absent ids are a no-op.
    Deregister {
        /// Connection being removed
        id: ConnectionId,
        /// Receives whether an entry was actually removed.
        /// `None` for fire-and-forget removal from a dropped guard.
        respond_to: Option<oneshot::Sender<bool>>,
    },

    /// Write a message to every member except `exclude`.
    Broadcast {
        /// Exact bytes to write, terminator included
        message: String,
        /// Sender, skipped during delivery
        exclude: ConnectionId,
        /// Channel to send the delivery report
        respond_to: oneshot::Sender<BroadcastReport>,
    },

    /// Snapshot of current members, ordered by id.
    Members {
        /// Channel to send the results
        respond_to: oneshot::Sender<Vec<MemberView>>,
    },
}

impl fmt::Debug for RegistryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register { id, username, .. } => f
                .debug_struct("Register")
                .field("id", id)
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Deregister { id, respond_to } => f
                .debug_struct("Deregister")
                .field("id", id)
                .field("awaited", &respond_to.is_some())
                .finish(),
            Self::Broadcast {
                message, exclude, ..
            } => f
                .debug_struct("Broadcast")
                .field("message", message)
                .field("exclude", exclude)
                .finish_non_exhaustive(),
            Self::Members { .. } => f.debug_struct("Members").finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A connection with this id is already a member.
    #[error("connection already registered: {0}")]
    AlreadyRegistered(ConnectionId),

    /// The actor has shut down.
    #[error("response channel closed")]
    ChannelClosed,
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients the message was written to
    pub delivered: Vec<ConnectionId>,

    /// Recipients whose write failed; they stay registered until their
    /// own handler notices the broken transport
    pub failed: Vec<ConnectionId>,
}

impl BroadcastReport {
    /// Every member the broadcast attempted, sorted by id.
    pub fn recipients(&self) -> Vec<ConnectionId> {
        let mut all = self.delivered.clone();
        all.extend(self.failed.iter().copied());
        all.sort_unstable();
        all
    }

    /// Number of members the broadcast attempted.
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// Read-only view of one registry member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberView {
    /// Connection id
    pub id: ConnectionId,
    /// Authenticated name
    pub username: Username,
    /// When the member was registered
    pub joined_at: DateTime<Utc>,
}
