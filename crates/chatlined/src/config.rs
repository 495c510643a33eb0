//! Server configuration.
//!
//! Settings come from an optional TOML file:
//!
//! ```toml
//! listen = "0.0.0.0:1234"
//! max_line_length = 1024
//! write_timeout_secs = 10
//!
//! [credentials]
//! user1 = "password1"
//! user2 = "password2"
//! ```
//!
//! Missing keys fall back to their defaults. With no file at all the server
//! listens on port 1234 and accepts the two built-in accounts.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use chatline_core::{CredentialStore, DomainError};
use chatline_protocol::{DEFAULT_MAX_LINE_LENGTH, DEFAULT_PORT};

use crate::registry::DEFAULT_WRITE_TIMEOUT;
use crate::server::SessionSettings;

/// File name looked up under the user config directory.
const CONFIG_FILE_NAME: &str = "chatlined.toml";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub listen: SocketAddr,

    /// Longest accepted line in bytes, excluding the newline
    pub max_line_length: usize,

    /// Upper bound on a single write to one client
    pub write_timeout_secs: u64,

    /// Accounts allowed to log in
    pub credentials: CredentialStore,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            write_timeout_secs: DEFAULT_WRITE_TIMEOUT.as_secs(),
            credentials: CredentialStore::default(),
        }
    }
}

impl ServerConfig {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml_str(&raw, path)
    }

    /// Parses and validates config text. `origin` is only used in errors.
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Picks the config source.
    ///
    /// An explicit path must exist. Otherwise the user config directory is
    /// tried, and built-in defaults are used when nothing is found there.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "Loading config from explicit path");
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "Loading config from default location");
                Self::load(&path)
            }
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Replaces the listen address.
    #[must_use]
    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    /// Checks settings that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_line_length == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "max_line_length",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.write_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "write_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.credentials.validate()?;
        Ok(())
    }

    /// Write timeout as a `Duration`.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Per-connection settings handed to every session handler.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_line_length: self.max_line_length,
            write_timeout: self.write_timeout(),
        }
    }
}

/// Default config file location (`~/.config/chatline/chatlined.toml` on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chatline").join(CONFIG_FILE_NAME))
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse config {path}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(#[from] DomainError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> PathBuf {
        PathBuf::from("test.toml")
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen.port(), 1234);
        assert!(config.listen.ip().is_unspecified());
        assert_eq!(config.max_line_length, 1024);
        assert_eq!(config.write_timeout(), Duration::from_secs(10));
        assert!(config.credentials.verify("user1", "password1"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let config = ServerConfig::from_toml_str("", &origin()).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_full_file() {
        let raw = r#"
            listen = "127.0.0.1:4000"
            max_line_length = 256
            write_timeout_secs = 3

            [credentials]
            alice = "wonderland"
        "#;
        let config = ServerConfig::from_toml_str(raw, &origin()).unwrap();
        assert_eq!(config.listen, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.max_line_length, 256);
        assert_eq!(config.write_timeout_secs, 3);
        assert!(config.credentials.verify("alice", "wonderland"));
        assert!(!config.credentials.verify("user1", "password1"));
    }

    #[test]
    fn test_rejects_bad_address() {
        let err = ServerConfig::from_toml_str("listen = \"not-an-address\"", &origin()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("test.toml"));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = ServerConfig::from_toml_str("port = 1234", &origin()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_rejects_zero_line_length() {
        let err = ServerConfig::from_toml_str("max_line_length = 0", &origin()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSetting {
                field: "max_line_length",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_write_timeout() {
        let err = ServerConfig::from_toml_str("write_timeout_secs = 0", &origin()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { .. }));
    }

    #[test]
    fn test_rejects_empty_username() {
        let raw = "[credentials]\n\"\" = \"secret\"\n";
        let err = ServerConfig::from_toml_str(raw, &origin()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCredentials(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatlined.toml");
        std::fs::write(&path, "listen = \"127.0.0.1:5555\"\n").unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.listen.port(), 5555);
    }

    #[test]
    fn test_resolve_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = ServerConfig::resolve(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_with_listen_overrides() {
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let config = ServerConfig::default().with_listen(addr);
        assert_eq!(config.listen, addr);
    }

    #[test]
    fn test_session_settings() {
        let settings = ServerConfig::default().session_settings();
        assert_eq!(settings.max_line_length, 1024);
        assert_eq!(settings.write_timeout, Duration::from_secs(10));
    }
}
