//! Coordinator heartbeat timer
//!
//! Runs only while this client holds the coordinator role. Every period it
//! opens a liveness round by sending `PING_START`, the last roster pushed
//! by the relay, and `PING_END` up the connection; the relay then pings
//! each named session individually. The task ends when the connection's
//! writer is gone.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use linechat_core::protocol::tokens;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Emit one `PING_START … PING_END` frame. Returns false once the outbox
/// is closed.
fn send_round(outbox: &UnboundedSender<String>, names: &[String]) -> bool {
    if outbox.send(tokens::PING_START.to_string()).is_err() {
        return false;
    }
    for name in names {
        if outbox.send(name.clone()).is_err() {
            return false;
        }
    }
    outbox.send(tokens::PING_END.to_string()).is_ok()
}

/// Open a liveness round immediately and then once per `period`.
pub async fn run(
    outbox: UnboundedSender<String>,
    roster: Arc<Mutex<Vec<String>>>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let names = roster.lock().unwrap().clone();
        debug!(targets = names.len(), "opening heartbeat round");
        if !send_round(&outbox, &names) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn frames_carry_markers_and_names() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let names = vec!["Alice".to_string(), "Bob".to_string()];
        assert!(send_round(&tx, &names));

        assert_eq!(rx.recv().await.unwrap(), tokens::PING_START);
        assert_eq!(rx.recv().await.unwrap(), "Alice");
        assert_eq!(rx.recv().await.unwrap(), "Bob");
        assert_eq!(rx.recv().await.unwrap(), tokens::PING_END);
    }

    #[tokio::test]
    async fn timer_stops_once_the_outbox_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let roster = Arc::new(Mutex::new(vec!["Alice".to_string()]));
        let task = tokio::spawn(run(tx, roster, Duration::from_millis(5)));

        drop(rx);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("heartbeat ends after outbox closes")
            .unwrap();
    }
}
