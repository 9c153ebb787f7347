//! Per-session delivery handle
//!
//! All traffic to one connected client flows through its `SessionHandle`:
//! an unbounded outbox drained by that connection's writer task. The handle
//! is the only way other tasks (registry walks, routing, liveness) reach a
//! session, which keeps per-sender delivery order intact — one queue, one
//! writer.

use std::net::SocketAddr;
use std::sync::Arc;

use linechat_core::SessionId;
use tokio::sync::{mpsc, Notify};

/// Shared handle through which the registry and router reach one session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    addr: SocketAddr,
    outbox: mpsc::UnboundedSender<String>,
    closer: Arc<Notify>,
}

impl SessionHandle {
    /// Create a handle and the outbox receiver its writer task will drain.
    pub fn new(id: SessionId, addr: SocketAddr) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        let handle = Self {
            id,
            addr,
            outbox,
            closer: Arc::new(Notify::new()),
        };
        (handle, outbox_rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queue one line for delivery. Returns false if the connection's
    /// writer is gone, which callers treat as a disconnect.
    pub fn send(&self, line: impl Into<String>) -> bool {
        self.outbox.send(line.into()).is_ok()
    }

    /// Whether the writer side has shut down (connection closed or failed).
    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }

    /// Ask the session's worker to shut down. Used for forced removal
    /// (liveness failure, listener shutdown) from outside the worker.
    pub fn request_close(&self) {
        self.closer.notify_one();
    }

    /// The notifier the worker selects on to observe `request_close`.
    pub fn closer(&self) -> Arc<Notify> {
        Arc::clone(&self.closer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handle() -> (SessionHandle, mpsc::UnboundedReceiver<String>) {
        SessionHandle::new(SessionId::new(1), "127.0.0.1:40000".parse().unwrap())
    }

    #[tokio::test]
    async fn send_reaches_the_outbox() {
        let (handle, mut rx) = test_handle();
        assert!(handle.send("hello"));
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (handle, rx) = test_handle();
        assert!(!handle.is_closed());
        drop(rx);
        assert!(handle.is_closed());
        assert!(!handle.send("hello"));
    }

    #[tokio::test]
    async fn close_request_wakes_a_waiter() {
        let (handle, _rx) = test_handle();
        let closer = handle.closer();
        handle.request_close();
        // The permit is stored, so a later wait completes immediately.
        closer.notified().await;
    }
}
