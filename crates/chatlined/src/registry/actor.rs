//! Registry actor - owns the member set and processes commands.
//!
//! The RegistryActor is the single owner of membership state. It receives
//! commands via an mpsc channel and handles them one at a time, which gives
//! register, deregister and broadcast the mutual exclusion of one lock.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Reply send failures are ignored (the caller went away)

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info};

use chatline_core::{ConnectionId, Username};

use super::commands::{BroadcastReport, MemberView, RegistryCommand, RegistryError};
use super::peer::{write_text, PeerWriter};

/// One registered connection.
struct Member {
    username: Username,
    writer: PeerWriter,
    joined_at: DateTime<Utc>,
}

/// The registry actor - owns all member state.
///
/// # Ownership
///
/// `members` is keyed by connection id; a `BTreeMap` so broadcasts visit
/// recipients in a stable order. Each entry holds a clone of the
/// connection's writer, shared with its session handler.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Registered connections
    members: BTreeMap<ConnectionId, Member>,

    /// Bound on each per-recipient write during a broadcast
    write_timeout: Duration,
}

impl RegistryActor {
    /// Creates a new registry actor.
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>, write_timeout: Duration) -> Self {
        Self {
            receiver,
            members: BTreeMap::new(),
            write_timeout,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all senders dropped).
    pub async fn run(mut self) {
        info!("Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!(members = self.members.len(), "Registry actor stopped");
    }

    /// Dispatches a command to the appropriate handler.
    async fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register {
                id,
                username,
                writer,
                respond_to,
            } => {
                let result = self.handle_register(id, username, writer);
                let _ = respond_to.send(result);
            }
            RegistryCommand::Deregister { id, respond_to } => {
                let removed = self.handle_deregister(id);
                if let Some(tx) = respond_to {
                    let _ = tx.send(removed);
                }
            }
            RegistryCommand::Broadcast {
                message,
                exclude,
                respond_to,
            } => {
                let report = self.handle_broadcast(&message, exclude).await;
                let _ = respond_to.send(report);
            }
            RegistryCommand::Members { respond_to } => {
                let _ = respond_to.send(self.handle_members());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_register(
        &mut self,
        id: ConnectionId,
        username: Username,
        writer: PeerWriter,
    ) -> Result<(), RegistryError> {
        if self.members.contains_key(&id) {
            debug!(connection = %id, "Connection already registered, rejecting");
            return Err(RegistryError::AlreadyRegistered(id));
        }

        info!(
            connection = %id,
            username = %username,
            total_members = self.members.len() + 1,
            "Member registered"
        );

        self.members.insert(
            id,
            Member {
                username,
                writer,
                joined_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn handle_deregister(&mut self, id: ConnectionId) -> bool {
        match self.members.remove(&id) {
            Some(member) => {
                info!(
                    connection = %id,
                    username = %member.username,
                    total_members = self.members.len(),
                    "Member removed"
                );
                true
            }
            None => {
                debug!(connection = %id, "Deregister for unknown connection, ignoring");
                false
            }
        }
    }

    /// Writes `message` to every member except `exclude`, in id order.
    ///
    /// A failed write is recorded and delivery continues. Membership is
    /// left alone: the failed member's own handler removes it once it
    /// sees the transport close.
    async fn handle_broadcast(&self, message: &str, exclude: ConnectionId) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (id, member) in &self.members {
            if *id == exclude {
                continue;
            }

            match write_text(&member.writer, message, self.write_timeout).await {
                Ok(()) => report.delivered.push(*id),
                Err(e) => {
                    debug!(
                        connection = %id,
                        username = %member.username,
                        error = %e,
                        "Failed to relay message to member"
                    );
                    report.failed.push(*id);
                }
            }
        }

        report
    }

    fn handle_members(&self) -> Vec<MemberView> {
        self.members
            .iter()
            .map(|(id, member)| MemberView {
                id: *id,
                username: member.username.clone(),
                joined_at: member.joined_at,
            })
            .collect()
    }

    /// Returns the number of members (for testing).
    #[cfg(test)]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
