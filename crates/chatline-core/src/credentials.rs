//! Static username/password table consulted during login.
//!
//! The store is built once at startup and never mutated afterwards, so it
//! is shared between session tasks behind a plain `Arc` with no locking.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::error::{DomainError, DomainResult};

/// Accounts available when no credentials are configured.
const DEFAULT_ACCOUNTS: [(&str, &str); 2] = [("user1", "password1"), ("user2", "password2")];

/// Immutable `username -> password` mapping.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CredentialStore {
    entries: HashMap<String, String>,
}

impl CredentialStore {
    /// Creates a store from an existing map.
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Creates a store with no accounts. Every login fails.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns true iff `username` exists and maps to exactly `password`.
    ///
    /// An unknown user and a wrong password give the same answer.
    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.entries
            .get(username)
            .is_some_and(|expected| expected == password)
    }

    /// Returns true if an account with this name exists.
    #[must_use]
    pub fn contains_user(&self, username: &str) -> bool {
        self.entries.contains_key(username)
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that every account could actually be typed over the wire.
    ///
    /// Lines are trimmed of `\r`/`\n` before lookup, so a name or password
    /// containing either can never match. Empty usernames are rejected too.
    pub fn validate(&self) -> DomainResult<()> {
        for (username, password) in &self.entries {
            if username.is_empty() {
                return Err(DomainError::InvalidUsername {
                    username: username.clone(),
                    reason: "must not be empty".to_string(),
                });
            }
            if has_line_break(username) {
                return Err(DomainError::InvalidUsername {
                    username: username.clone(),
                    reason: "must not contain line breaks".to_string(),
                });
            }
            if has_line_break(password) {
                return Err(DomainError::InvalidPassword {
                    username: username.clone(),
                    reason: "must not contain line breaks".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\n', '\r'])
}

impl Default for CredentialStore {
    fn default() -> Self {
        DEFAULT_ACCOUNTS
            .iter()
            .map(|(user, pass)| (user.to_string(), pass.to_string()))
            .collect()
    }
}

impl FromIterator<(String, String)> for CredentialStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// Passwords stay out of logs.
impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut users: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        users.sort_unstable();
        f.debug_struct("CredentialStore")
            .field("users", &users)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::default()
    }

    #[test]
    fn test_verify_known_pairs() {
        let store = store();
        assert!(store.verify("user1", "password1"));
        assert!(store.verify("user2", "password2"));
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        assert!(!store().verify("user1", "password2"));
        assert!(!store().verify("user1", "wrongpass"));
    }

    #[test]
    fn test_verify_rejects_unknown_user() {
        assert!(!store().verify("mallory", "password1"));
    }

    #[test]
    fn test_verify_rejects_empty_pair() {
        assert!(!store().verify("", ""));
    }

    #[test]
    fn test_verify_is_case_sensitive() {
        let store = store();
        assert!(!store.verify("User1", "password1"));
        assert!(!store.verify("user1", "Password1"));
    }

    #[test]
    fn test_verify_does_not_trim() {
        assert!(!store().verify("user1", "password1 "));
        assert!(!store().verify(" user1", "password1"));
    }

    #[test]
    fn test_empty_store_rejects_everything() {
        let store = CredentialStore::empty();
        assert!(store.is_empty());
        assert!(!store.verify("user1", "password1"));
    }

    #[test]
    fn test_from_iterator() {
        let store: CredentialStore = vec![("alice".to_string(), "s3cret".to_string())]
            .into_iter()
            .collect();
        assert_eq!(store.len(), 1);
        assert!(store.contains_user("alice"));
        assert!(store.verify("alice", "s3cret"));
    }

    #[test]
    fn test_debug_hides_passwords() {
        let rendered = format!("{:?}", store());
        assert!(rendered.contains("user1"));
        assert!(!rendered.contains("password1"));
    }

    #[test]
    fn test_validate_rejects_empty_username() {
        let store = CredentialStore::new(HashMap::from([(String::new(), "x".to_string())]));
        assert!(matches!(
            store.validate(),
            Err(DomainError::InvalidUsername { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_line_breaks() {
        let store = CredentialStore::new(HashMap::from([("a\nb".to_string(), "x".to_string())]));
        assert!(store.validate().is_err());

        let store = CredentialStore::new(HashMap::from([("a".to_string(), "x\r".to_string())]));
        assert!(matches!(
            store.validate(),
            Err(DomainError::InvalidPassword { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(store().validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_toml_table() {
        let store: CredentialStore = toml::from_str("alice = \"a\"\nbob = \"b\"\n").unwrap();
        assert!(store.verify("alice", "a"));
        assert!(store.verify("bob", "b"));
        assert_eq!(store.len(), 2);
    }
}
