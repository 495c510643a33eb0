//! Connection identity and session lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique identifier for one accepted connection.
///
/// Assigned from a monotonic counter on accept and never reused while
/// the server process lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a connection ID from a raw counter value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Name a client authenticated as.
///
/// Set once, at the moment authentication succeeds, and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Wraps a username string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Username {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle state of one connection.
///
/// ```text
/// Connected -> AwaitingUsername -> AwaitingPassword -> Active -> Closed
///     │               │                   │              │
///     └───────────────┴───────────────────┴──────────────┴──▶ Closed
/// ```
///
/// Only `Active` connections are members of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Transport accepted, nothing sent yet.
    #[default]
    Connected,

    /// Username prompt sent.
    AwaitingUsername,

    /// Password prompt sent, candidate username stored.
    AwaitingPassword,

    /// Authenticated and registered; lines are relayed.
    Active,

    /// Terminal. Resources released.
    Closed,
}

impl SessionState {
    /// Returns the display label for this state.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::AwaitingUsername => "awaiting_username",
            Self::AwaitingPassword => "awaiting_password",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Every non-terminal state may move to `Closed`; otherwise only the
    /// forward step is allowed (and `Active` may loop onto itself).
    #[must_use]
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match (self, next) {
            (Self::Closed, _) => false,
            (_, Self::Closed) => true,
            (Self::Connected, Self::AwaitingUsername)
            | (Self::AwaitingUsername, Self::AwaitingPassword)
            | (Self::AwaitingPassword, Self::Active)
            | (Self::Active, Self::Active) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
