//! Inbound traffic handling
//!
//! Consumes lines from the relay after the handshake: control tokens are
//! acted on (pong replies, roster pushes, coordinator promotion, quit
//! acknowledgment) and everything else is chat output printed to the
//! console.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use linechat_core::protocol::tokens;
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::heartbeat;

/// Inbound loop for one connected client.
pub struct Printer<R> {
    lines: Lines<R>,
    outbox: UnboundedSender<String>,
    roster: Arc<Mutex<Vec<String>>>,
    heartbeat_period: Duration,
    heartbeat_started: bool,
}

impl<R: AsyncBufRead + Unpin> Printer<R> {
    pub fn new(lines: Lines<R>, outbox: UnboundedSender<String>, heartbeat_period: Duration) -> Self {
        Self {
            lines,
            outbox,
            roster: Arc::new(Mutex::new(Vec::new())),
            heartbeat_period,
            heartbeat_started: false,
        }
    }

    /// Run until the relay acknowledges a quit or the connection closes.
    pub async fn run(mut self) {
        while let Ok(Some(line)) = self.lines.next_line().await {
            match line.as_str() {
                tokens::QUIT_SUCCESS => {
                    info!("quit acknowledged by server");
                    break;
                }
                tokens::NAMES_BEGIN => self.store_roster().await,
                tokens::PING => {
                    // Pong immediately; the server's round window is short.
                    let _ = self.outbox.send(tokens::PING.to_string());
                }
                tokens::NEW_COORDINATOR => self.start_heartbeat(),
                _ => println!("{}", line),
            }
        }
    }

    /// Replace the stored roster with the names of the current push.
    async fn store_roster(&mut self) {
        let mut names = Vec::new();
        while let Ok(Some(line)) = self.lines.next_line().await {
            if line == tokens::NAMES_END {
                break;
            }
            names.push(line);
        }
        debug!(members = names.len(), "roster updated");
        *self.roster.lock().unwrap() = names;
    }

    /// Promotion to coordinator: start the round timer once.
    fn start_heartbeat(&mut self) {
        info!("promoted to session coordinator");
        if self.heartbeat_started {
            return;
        }
        self.heartbeat_started = true;
        tokio::spawn(heartbeat::run(
            self.outbox.clone(),
            Arc::clone(&self.roster),
            self.heartbeat_period,
        ));
    }

    #[cfg(test)]
    fn roster(&self) -> Vec<String> {
        self.roster.lock().unwrap().clone()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn printer_over_duplex() -> (
        tokio::io::DuplexStream,
        Printer<BufReader<tokio::io::DuplexStream>>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (server_side, client_side) = tokio::io::duplex(4096);
        let (tx, rx) = mpsc::unbounded_channel();
        let printer = Printer::new(
            BufReader::new(client_side).lines(),
            tx,
            Duration::from_millis(10),
        );
        (server_side, printer, rx)
    }

    #[tokio::test]
    async fn pings_are_answered_immediately() {
        let (mut server, printer, mut rx) = printer_over_duplex();
        let task = tokio::spawn(printer.run());

        server.write_all(b"PING\n").await.unwrap();
        let reply = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, tokens::PING);

        drop(server);
        let _ = task.await;
    }

    #[tokio::test]
    async fn roster_pushes_replace_the_stored_names() {
        let (mut server, mut printer, _rx) = printer_over_duplex();

        server
            .write_all(b"NAMES_BEGIN\nAlice\nBob\nNAMES_END\n")
            .await
            .unwrap();
        drop(server);

        // Drive the loop by hand so the roster is observable afterwards.
        while let Ok(Some(line)) = printer.lines.next_line().await {
            if line == tokens::NAMES_BEGIN {
                printer.store_roster().await;
            }
        }
        assert_eq!(printer.roster(), vec!["Alice".to_string(), "Bob".to_string()]);
    }

    #[tokio::test]
    async fn quit_acknowledgment_ends_the_loop() {
        let (mut server, printer, _rx) = printer_over_duplex();
        let task = tokio::spawn(printer.run());

        server.write_all(b"QUIT_SUCCESS\n").await.unwrap();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("printer ends on quit ack")
            .unwrap();
    }

    #[tokio::test]
    async fn promotion_starts_heartbeat_rounds() {
        let (mut server, printer, mut rx) = printer_over_duplex();
        let task = tokio::spawn(printer.run());

        server
            .write_all(b"NAMES_BEGIN\nAlice\nNAMES_END\nNEW_COORDINATOR\n")
            .await
            .unwrap();

        let mut frame = Vec::new();
        for _ in 0..3 {
            frame.push(
                timeout(Duration::from_secs(1), rx.recv())
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }
        assert_eq!(
            frame,
            vec![
                tokens::PING_START.to_string(),
                "Alice".to_string(),
                tokens::PING_END.to_string()
            ]
        );

        drop(server);
        let _ = task.await;
    }
}
