//! Fixed lines exchanged between server and client.

use std::fmt;

use chatline_core::Username;

/// Default TCP port for the chat server.
pub const DEFAULT_PORT: u16 = 1234;

/// Literal line a client sends to leave the chat.
pub const EXIT_COMMAND: &str = "exit";

const USERNAME_PROMPT: &str = "Enter username:\n";
const PASSWORD_PROMPT: &str = "Enter password:\n";
const AUTH_FAILED: &str = "Authentication Failed!\n";
const AUTH_SUCCEEDED: &str = "Authentication Successful!\n\
Welcome to the chat server. Type your messages (type 'exit' to disconnect):\n";

/// Lines the server writes to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// First thing sent after accept
    UsernamePrompt,

    /// Sent once the username line arrives
    PasswordPrompt,

    /// Credentials rejected; the server closes the connection next
    AuthenticationFailed,

    /// Credentials accepted; two lines including the welcome banner
    AuthenticationSucceeded,

    /// A chat line relayed from another member
    Relay {
        /// Who sent it
        from: Username,
        /// The trimmed chat text
        text: String,
    },
}

impl ServerLine {
    /// Creates a relay line.
    pub fn relay(from: Username, text: impl Into<String>) -> Self {
        Self::Relay {
            from,
            text: text.into(),
        }
    }

    /// Renders the exact bytes sent on the wire, terminator included.
    pub fn to_wire(&self) -> String {
        match self {
            Self::UsernamePrompt => USERNAME_PROMPT.to_string(),
            Self::PasswordPrompt => PASSWORD_PROMPT.to_string(),
            Self::AuthenticationFailed => AUTH_FAILED.to_string(),
            Self::AuthenticationSucceeded => AUTH_SUCCEEDED.to_string(),
            Self::Relay { from, text } => format!("{from}: {text}\n"),
        }
    }
}

impl fmt::Display for ServerLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// A trimmed line received from an authenticated client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientLine {
    /// Exactly `exit`: leave without broadcasting
    Exit,

    /// Anything else is chat, including the empty line
    Chat(String),
}

impl ClientLine {
    /// Classifies an already trimmed line.
    ///
    /// The exit match is exact and case-sensitive.
    pub fn parse(line: &str) -> Self {
        if line == EXIT_COMMAND {
            Self::Exit
        } else {
            Self::Chat(line.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_wire_format() {
        assert_eq!(ServerLine::UsernamePrompt.to_wire(), "Enter username:\n");
        assert_eq!(ServerLine::PasswordPrompt.to_wire(), "Enter password:\n");
        assert_eq!(
            ServerLine::AuthenticationFailed.to_wire(),
            "Authentication Failed!\n"
        );
    }

    #[test]
    fn test_success_banner_is_two_lines() {
        let banner = ServerLine::AuthenticationSucceeded.to_wire();
        assert_eq!(
            banner,
            "Authentication Successful!\nWelcome to the chat server. Type your messages (type 'exit' to disconnect):\n"
        );
        assert_eq!(banner.lines().count(), 2);
    }

    #[test]
    fn test_relay_format() {
        let line = ServerLine::relay(Username::from("user1"), "hello");
        assert_eq!(line.to_wire(), "user1: hello\n");
        assert_eq!(line.to_string(), "user1: hello\n");
    }

    #[test]
    fn test_client_line_exit() {
        assert_eq!(ClientLine::parse("exit"), ClientLine::Exit);
    }

    #[test]
    fn test_client_line_exit_is_exact() {
        assert_eq!(ClientLine::parse("Exit"), ClientLine::Chat("Exit".to_string()));
        assert_eq!(ClientLine::parse("exit now"), ClientLine::Chat("exit now".to_string()));
        assert_eq!(ClientLine::parse(" exit"), ClientLine::Chat(" exit".to_string()));
    }

    #[test]
    fn test_client_line_empty_is_chat() {
        assert_eq!(ClientLine::parse(""), ClientLine::Chat(String::new()));
    }
}
