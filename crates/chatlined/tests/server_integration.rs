//! Integration tests for the TCP chat server.
//!
//! These tests run a real `ChatServer` on a loopback port and drive it with
//! plain TCP clients: login, relay, exit and shutdown.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.
//! We test the panic-free behavior of production code through assertions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chatline_core::CredentialStore;
use chatlined::config::ServerConfig;
use chatlined::registry::{spawn_registry, RegistryHandle};
use chatlined::server::{ChatServer, SessionSettings};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on any single read in these tests
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between registry polls
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Maximum time to wait for the registry to reach a size
const REGISTRY_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

const WELCOME: &str =
    "Welcome to the chat server. Type your messages (type 'exit' to disconnect):\n";

// ============================================================================
// Test Helpers
// ============================================================================

/// Test server context that manages server lifecycle.
struct TestServer {
    addr: SocketAddr,
    registry: RegistryHandle,
    cancel_token: CancellationToken,
}

impl TestServer {
    /// Spawns a server with the default credentials on a free loopback port.
    async fn spawn() -> Self {
        Self::spawn_with(Arc::new(CredentialStore::default())).await
    }

    /// Spawns a server with the given credentials.
    async fn spawn_with(credentials: Arc<CredentialStore>) -> Self {
        let registry = spawn_registry();
        let cancel_token = CancellationToken::new();

        let server = ChatServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            registry.clone(),
            credentials,
            SessionSettings::default(),
            cancel_token.clone(),
        )
        .await
        .expect("bind test server");
        let addr = server.local_addr().expect("local addr");

        tokio::spawn(async move {
            server.run().await;
        });

        Self {
            addr,
            registry,
            cancel_token,
        }
    }

    /// Opens a raw client connection.
    async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).await.expect("connect to server");
        TestClient::new(stream)
    }

    /// Connects and completes a login, consuming the two banner lines.
    async fn login(&self, username: &str, password: &str) -> TestClient {
        let mut client = self.connect().await;
        client.login(username, password).await;
        assert_eq!(client.recv().await, "Authentication Successful!\n");
        assert_eq!(client.recv().await, WELCOME);
        client
    }

    /// Waits until the registry holds exactly `count` members.
    async fn wait_for_members(&self, count: usize) {
        let start = tokio::time::Instant::now();
        loop {
            let current = self.registry.member_count().await;
            if current == count {
                return;
            }
            assert!(
                start.elapsed() < REGISTRY_WAIT_TIMEOUT,
                "registry stuck at {current} members, expected {count}"
            );
            sleep(POLL_INTERVAL).await;
        }
    }

    fn shutdown(self) {
        self.cancel_token.cancel();
    }
}

/// Test client connection with line helpers.
struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Sends raw bytes.
    async fn send(&mut self, data: &str) {
        self.writer.write_all(data.as_bytes()).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Receives one line, including its newline.
    async fn recv(&mut self) -> String {
        let mut line = String::new();
        timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        line
    }

    /// Receives a line if one arrives within `duration`.
    async fn recv_timeout(&mut self, duration: Duration) -> Option<String> {
        let mut line = String::new();
        match timeout(duration, self.reader.read_line(&mut line)).await {
            Ok(Ok(n)) if n > 0 => Some(line),
            _ => None,
        }
    }

    /// Reads until the server closes the connection; returns what was left.
    async fn read_to_close(&mut self) -> String {
        let mut rest = String::new();
        timeout(READ_TIMEOUT, self.reader.read_to_string(&mut rest))
            .await
            .expect("server did not close the connection")
            .unwrap();
        rest
    }

    /// Answers both prompts.
    async fn login(&mut self, username: &str, password: &str) {
        assert_eq!(self.recv().await, "Enter username:\n");
        self.send(&format!("{username}\n")).await;
        assert_eq!(self.recv().await, "Enter password:\n");
        self.send(&format!("{password}\n")).await;
    }
}

// ============================================================================
// Login Tests
// ============================================================================

#[tokio::test]
async fn test_login_success_registers_client() {
    let server = TestServer::spawn().await;

    let _client = server.login("user1", "password1").await;
    server.wait_for_members(1).await;

    let members = server.registry.members().await;
    assert_eq!(members[0].username.as_str(), "user1");

    server.shutdown();
}

#[tokio::test]
async fn test_login_failure_closes_connection() {
    let server = TestServer::spawn().await;

    let mut client = server.connect().await;
    client.login("user1", "wrongpass").await;
    assert_eq!(client.recv().await, "Authentication Failed!\n");
    assert_eq!(client.read_to_close().await, "");

    assert_eq!(server.registry.member_count().await, 0);
    server.shutdown();
}

#[tokio::test]
async fn test_login_with_crlf_line_endings() {
    let server = TestServer::spawn().await;

    let mut client = server.connect().await;
    assert_eq!(client.recv().await, "Enter username:\n");
    client.send("user2\r\n").await;
    assert_eq!(client.recv().await, "Enter password:\n");
    client.send("password2\r\n").await;
    assert_eq!(client.recv().await, "Authentication Successful!\n");

    server.wait_for_members(1).await;
    server.shutdown();
}

#[tokio::test]
async fn test_disconnect_during_login_leaves_registry_empty() {
    let server = TestServer::spawn().await;

    let mut client = server.connect().await;
    assert_eq!(client.recv().await, "Enter username:\n");
    client.send("user1\n").await;
    drop(client);

    sleep(Duration::from_millis(50)).await;
    assert_eq!(server.registry.member_count().await, 0);
    server.shutdown();
}

#[tokio::test]
async fn test_credentials_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatlined.toml");
    std::fs::write(
        &path,
        "listen = \"127.0.0.1:0\"\n\n[credentials]\nalice = \"s3cret\"\n",
    )
    .unwrap();

    let config = ServerConfig::load(&path).unwrap();
    let server = TestServer::spawn_with(Arc::new(config.credentials)).await;

    let _alice = server.login("alice", "s3cret").await;

    let mut stranger = server.connect().await;
    stranger.login("user1", "password1").await;
    assert_eq!(stranger.recv().await, "Authentication Failed!\n");

    server.wait_for_members(1).await;
    server.shutdown();
}

// ============================================================================
// Relay Tests
// ============================================================================

#[tokio::test]
async fn test_message_relayed_to_others_only() {
    let server = TestServer::spawn().await;

    let mut alice = server.login("user1", "password1").await;
    let mut bob = server.login("user2", "password2").await;
    server.wait_for_members(2).await;

    alice.send("hello\n").await;
    assert_eq!(bob.recv().await, "user1: hello\n");
    assert_eq!(alice.recv_timeout(Duration::from_millis(100)).await, None);

    server.shutdown();
}

#[tokio::test]
async fn test_relay_reaches_every_other_member() {
    let server = TestServer::spawn().await;

    let mut sender = server.login("user1", "password1").await;
    let mut second = server.login("user2", "password2").await;
    // Same account twice is allowed.
    let mut third = server.login("user2", "password2").await;
    server.wait_for_members(3).await;

    sender.send("hi all\r\n").await;
    assert_eq!(second.recv().await, "user1: hi all\n");
    assert_eq!(third.recv().await, "user1: hi all\n");

    server.shutdown();
}

#[tokio::test]
async fn test_messages_from_one_sender_arrive_in_order() {
    let server = TestServer::spawn().await;

    let mut alice = server.login("user1", "password1").await;
    let mut bob = server.login("user2", "password2").await;
    server.wait_for_members(2).await;

    for i in 0..20 {
        alice.send(&format!("line {i}\n")).await;
    }
    for i in 0..20 {
        assert_eq!(bob.recv().await, format!("user1: line {i}\n"));
    }

    server.shutdown();
}

#[tokio::test]
async fn test_empty_line_is_relayed() {
    let server = TestServer::spawn().await;

    let mut alice = server.login("user1", "password1").await;
    let mut bob = server.login("user2", "password2").await;
    server.wait_for_members(2).await;

    alice.send("\n").await;
    assert_eq!(bob.recv().await, "user1: \n");

    server.shutdown();
}

// ============================================================================
// Exit / Disconnect Tests
// ============================================================================

#[tokio::test]
async fn test_exit_removes_client_without_broadcast() {
    let server = TestServer::spawn().await;

    let mut alice = server.login("user1", "password1").await;
    let mut bob = server.login("user2", "password2").await;
    server.wait_for_members(2).await;

    alice.send("exit\n").await;
    assert_eq!(alice.read_to_close().await, "");
    server.wait_for_members(1).await;

    // Bob never saw the exit line.
    assert_eq!(bob.recv_timeout(Duration::from_millis(100)).await, None);

    server.shutdown();
}

#[tokio::test]
async fn test_exit_with_surrounding_text_is_chat() {
    let server = TestServer::spawn().await;

    let mut alice = server.login("user1", "password1").await;
    let mut bob = server.login("user2", "password2").await;
    server.wait_for_members(2).await;

    alice.send("exit now\n").await;
    assert_eq!(bob.recv().await, "user1: exit now\n");
    alice.send(" exit\n").await;
    assert_eq!(bob.recv().await, "user1:  exit\n");

    server.wait_for_members(2).await;
    server.shutdown();
}

#[tokio::test]
async fn test_abrupt_disconnect_deregisters() {
    let server = TestServer::spawn().await;

    let alice = server.login("user1", "password1").await;
    let mut bob = server.login("user2", "password2").await;
    server.wait_for_members(2).await;

    drop(alice);
    server.wait_for_members(1).await;

    // The remaining member can still chat with a newcomer.
    let mut carol = server.login("user1", "password1").await;
    server.wait_for_members(2).await;
    bob.send("still here\n").await;
    assert_eq!(carol.recv().await, "user2: still here\n");

    server.shutdown();
}

// ============================================================================
// Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_shutdown_closes_sessions_and_empties_registry() {
    let server = TestServer::spawn().await;

    let mut alice = server.login("user1", "password1").await;
    server.wait_for_members(1).await;

    let registry = server.registry.clone();
    server.shutdown();

    assert_eq!(alice.read_to_close().await, "");

    let start = tokio::time::Instant::now();
    while registry.member_count().await != 0 {
        assert!(start.elapsed() < REGISTRY_WAIT_TIMEOUT, "members left after shutdown");
        sleep(POLL_INTERVAL).await;
    }
}
