//! End-to-end tests for the relay over loopback TCP
//!
//! Each test binds a relay on an ephemeral port and drives it with raw
//! line-oriented clients, exercising the registration handshake, routing
//! rules, coordinator election, and heartbeat-driven removal exactly as a
//! real client would.

use std::net::SocketAddr;
use std::time::Duration;

use linechat_core::{SeededRandom, ServerConfig, TimingConfig};
use linechat_server::RelayServer;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

async fn start_relay(seed: u64) -> SocketAddr {
    let config = ServerConfig {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        timing: TimingConfig::fast(),
    };
    let server = RelayServer::bind_with(config, Box::new(SeededRandom::new(seed)))
        .await
        .expect("bind relay");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.run());
    addr
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read_half, write_half) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer: write_half,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("send line");
    }

    async fn recv(&mut self) -> String {
        timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("line within timeout")
            .expect("read line")
            .expect("connection open")
    }

    /// Collect lines until one satisfies the predicate; returns everything
    /// collected including the match.
    async fn recv_until(&mut self, pred: impl Fn(&str) -> bool) -> Vec<String> {
        let mut collected = Vec::new();
        loop {
            let line = self.recv().await;
            let done = pred(&line);
            collected.push(line);
            if done {
                return collected;
            }
        }
    }

    /// True once the server closes this connection.
    async fn closed(&mut self) -> bool {
        matches!(
            timeout(RECV_TIMEOUT, async {
                loop {
                    match self.lines.next_line().await {
                        Ok(Some(_)) => continue,
                        Ok(None) | Err(_) => break,
                    }
                }
            })
            .await,
            Ok(())
        )
    }
}

/// Register a name and complete the readiness handshake, skimming the
/// welcome block (which always ends with the coordinator summary).
async fn register(addr: SocketAddr, name: &str) -> TestClient {
    let mut client = TestClient::connect(addr).await;
    client.send(name).await;
    assert_eq!(client.recv().await, "NAME_ACCEPTED");
    client.send("READY").await;
    client
        .recv_until(|l| l.starts_with("The current coordinator is:"))
        .await;
    client
}

// ----------------------------------------------------------------------------
// Registration
// ----------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_names_are_rejected_until_distinct() {
    let addr = start_relay(1).await;
    let _alice = register(addr, "Alice").await;

    let mut second = TestClient::connect(addr).await;
    second.send("Alice").await;
    assert_eq!(second.recv().await, "NAME_TAKEN");
    second.send("Bob").await;
    assert_eq!(second.recv().await, "NAME_ACCEPTED");
}

#[tokio::test]
async fn non_ready_input_after_acceptance_closes_the_connection() {
    let addr = start_relay(2).await;
    let _alice = register(addr, "Alice").await;

    let mut violator = TestClient::connect(addr).await;
    violator.send("Bob").await;
    assert_eq!(violator.recv().await, "NAME_ACCEPTED");
    violator.send("definitely not ready").await;
    assert!(violator.closed().await);

    // The violator's registration was rolled back, so the name is free.
    let mut again = TestClient::connect(addr).await;
    again.send("Bob").await;
    assert_eq!(again.recv().await, "NAME_ACCEPTED");
}

#[tokio::test]
async fn quit_frees_the_name_for_reuse() {
    let addr = start_relay(3).await;
    let mut alice = register(addr, "Alice").await;

    alice.send("!quit").await;
    alice.recv_until(|l| l == "QUIT_SUCCESS").await;
    assert!(alice.closed().await);

    let mut replacement = TestClient::connect(addr).await;
    replacement.send("Alice").await;
    assert_eq!(replacement.recv().await, "NAME_ACCEPTED");
}

// ----------------------------------------------------------------------------
// Routing
// ----------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_reaches_everyone_except_the_sender() {
    let addr = start_relay(4).await;
    let mut alice = register(addr, "Alice").await;
    let mut bob = register(addr, "Bob").await;
    let mut carol = register(addr, "Carol").await;

    bob.send("hello everyone").await;
    alice.recv_until(|l| l.ends_with("Bob: hello everyone")).await;
    carol.recv_until(|l| l.ends_with("Bob: hello everyone")).await;

    // Bob sees Carol's follow-up but never his own broadcast.
    carol.send("done").await;
    let lines = bob.recv_until(|l| l.ends_with("Carol: done")).await;
    assert!(!lines.iter().any(|l| l.contains("hello everyone")));
}

#[tokio::test]
async fn private_messages_reach_only_the_target_and_echo_to_sender() {
    let addr = start_relay(5).await;
    let mut alice = register(addr, "Alice").await;
    let mut bob = register(addr, "Bob").await;
    let mut carol = register(addr, "Carol").await;

    bob.send("!private Carol").await;
    bob.recv_until(|l| l == "=== Current private recipient: Carol ===")
        .await;
    bob.send("hi").await;

    carol
        .recv_until(|l| l.ends_with("Bob (PRIVATE): hi"))
        .await;
    bob.recv_until(|l| l.ends_with("Bob (PRIVATE): hi")).await;

    // Alice never sees the private line: everything up to Carol's public
    // marker is free of it.
    carol.send("!broadcast").await;
    carol
        .recv_until(|l| l == "=== Switched to broadcast mode! ===")
        .await;
    carol.send("marker").await;
    let lines = alice.recv_until(|l| l.ends_with("Carol: marker")).await;
    assert!(!lines.iter().any(|l| l.contains("(PRIVATE)")));
}

#[tokio::test]
async fn private_target_must_exist() {
    let addr = start_relay(6).await;
    let mut alice = register(addr, "Alice").await;

    alice.send("!private Nobody").await;
    alice
        .recv_until(|l| l == "Username not found in active users!")
        .await;
}

// ----------------------------------------------------------------------------
// Coordinator Election
// ----------------------------------------------------------------------------

#[tokio::test]
async fn first_active_session_is_promoted() {
    let addr = start_relay(7).await;
    let mut alice = TestClient::connect(addr).await;
    alice.send("Alice").await;
    assert_eq!(alice.recv().await, "NAME_ACCEPTED");
    alice.send("READY").await;

    let lines = alice
        .recv_until(|l| l.starts_with("The current coordinator is:"))
        .await;
    assert!(lines.contains(&"NEW_COORDINATOR".to_string()));
    assert!(lines.contains(&"NAMES_BEGIN".to_string()));
    assert!(lines.iter().any(|l| l.contains("coordinator is: Alice")));
}

#[tokio::test]
async fn unclean_coordinator_loss_reelects_and_notifies_survivors() {
    let addr = start_relay(8).await;
    let alice = register(addr, "Alice").await;
    let mut bob = register(addr, "Bob").await;
    let mut carol = register(addr, "Carol").await;

    // Alice (the coordinator) vanishes without a quit.
    drop(alice);

    let bob_lines = bob
        .recv_until(|l| l.starts_with("Coordinator changed. The new coordinator is "))
        .await;
    let carol_lines = carol
        .recv_until(|l| l.starts_with("Coordinator changed. The new coordinator is "))
        .await;

    for lines in [&bob_lines, &carol_lines] {
        assert!(lines.contains(&"Alice has left the chat!".to_string()));
    }

    // Exactly one survivor was handed the role.
    let promotions = [&bob_lines, &carol_lines]
        .iter()
        .filter(|lines| lines.contains(&"NEW_COORDINATOR".to_string()))
        .count();
    assert_eq!(promotions, 1);
}

// ----------------------------------------------------------------------------
// Heartbeat Liveness
// ----------------------------------------------------------------------------

#[tokio::test]
async fn silent_heartbeat_target_is_removed_and_responders_survive() {
    let addr = start_relay(9).await;
    let mut alice = register(addr, "Alice").await;
    let bob = register(addr, "Bob").await;
    let _carol = register(addr, "Carol").await;

    // Bob answers every ping; Carol never does.
    let (mut bob_lines, mut bob_writer) = (bob.lines, bob.writer);
    tokio::spawn(async move {
        while let Ok(Some(line)) = bob_lines.next_line().await {
            if line == "PING" {
                let _ = bob_writer.write_all(b"PING\n").await;
            }
        }
    });

    // Drive one round from the coordinator's connection.
    alice.send("PING_START").await;
    alice.send("Bob").await;
    alice.send("Carol").await;
    alice.send("PING_END").await;

    alice
        .recv_until(|l| l == "Carol has left the chat!")
        .await;

    // Bob is still registered, Carol is gone. The coordinator summary acts
    // as a sentinel so the roster rows are fully collected.
    alice.send("!online").await;
    alice.send("!coordinator").await;
    let lines = alice
        .recv_until(|l| l.starts_with("The current coordinator is:"))
        .await;
    assert!(lines.iter().any(|l| l.contains("Bob")));
    assert!(!lines.iter().any(|l| l.contains("Carol")));
}
