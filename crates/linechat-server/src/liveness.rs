//! Heartbeat rounds and pong tracking
//!
//! The coordinator client periodically sends `PING_START`, the roster
//! names, and `PING_END` up its own connection. The coordinator's session
//! worker runs the round server-side: each named target gets an individual
//! `PING` and a bounded window to answer. Targets whose window closes
//! without a pong are removed from the registry like any other disconnect.
//! Rounds run inline on the coordinator's worker, so they never overlap.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use linechat_core::protocol::tokens;
use tokio::sync::{mpsc, Notify};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use crate::registry::Registry;

/// Upper bound on waiting for the next target name of a round. A
/// coordinator that opened a round but stopped feeding names is stalled;
/// the round is abandoned rather than pinning its worker.
const ROUND_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

// ----------------------------------------------------------------------------
// Pong Tracking
// ----------------------------------------------------------------------------

/// Pending-pong state for the heartbeat round in flight.
///
/// Armed with the round's target names by the coordinator's worker;
/// reader tasks record pongs as they arrive. A pong for a name that was
/// never armed (stale or duplicate) is ignored.
pub struct PingTracker {
    pending: Mutex<HashMap<String, bool>>,
    notify: Notify,
}

impl PingTracker {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            notify: Notify::new(),
        }
    }

    /// Reset the tracker to one unanswered entry per target.
    pub fn arm(&self, targets: &[String]) {
        let mut pending = self.pending.lock().unwrap();
        pending.clear();
        for target in targets {
            pending.insert(target.clone(), false);
        }
    }

    /// Record a pong. Returns false for names with no pending entry.
    pub fn record_pong(&self, name: &str) -> bool {
        let mut pending = self.pending.lock().unwrap();
        match pending.get_mut(name) {
            Some(responded) => {
                *responded = true;
                drop(pending);
                self.notify.notify_waiters();
                true
            }
            None => false,
        }
    }

    fn responded(&self, name: &str) -> bool {
        self.pending.lock().unwrap().get(name).copied().unwrap_or(false)
    }

    /// Wait for `name`'s pong, up to `window`. The deadline is a hard upper
    /// bound; pongs for other targets do not extend it.
    pub async fn await_pong(&self, name: &str, window: Duration) -> bool {
        let deadline = Instant::now() + window;
        loop {
            let notified = self.notify.notified();
            if self.responded(name) {
                return true;
            }
            if timeout_at(deadline, notified).await.is_err() {
                return self.responded(name);
            }
        }
    }

    /// Drop all pending entries at the end of a round.
    pub fn clear(&self) {
        self.pending.lock().unwrap().clear();
    }
}

impl Default for PingTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Round Execution
// ----------------------------------------------------------------------------

/// Run one heartbeat round on the coordinator's worker.
///
/// Consumes target names from the coordinator's inbox until `PING_END`,
/// pings each target in turn, and removes every target that stays silent
/// through its window. Afterwards the registry re-validates all remaining
/// connections.
pub async fn run_round(
    registry: &Registry,
    tracker: &PingTracker,
    inbox: &mut mpsc::UnboundedReceiver<String>,
    ping_timeout: Duration,
) {
    let mut targets = Vec::new();
    loop {
        match timeout(ROUND_FRAME_TIMEOUT, inbox.recv()).await {
            Ok(Some(line)) if line == tokens::PING_END => break,
            Ok(Some(line)) => targets.push(line),
            Ok(None) => {
                debug!("coordinator connection closed mid-round");
                return;
            }
            Err(_) => {
                warn!("heartbeat round abandoned: no PING_END from coordinator");
                return;
            }
        }
    }

    debug!(targets = targets.len(), "heartbeat round started");
    tracker.arm(&targets);
    for name in &targets {
        // Names with no registered session (departed since the roster was
        // pushed) are skipped.
        let Some(id) = registry.find_by_name(name) else {
            continue;
        };
        if !registry.deliver(id, tokens::PING) {
            continue;
        }
        if !tracker.await_pong(name, ping_timeout).await {
            warn!(name = name.as_str(), "no pong within window, removing session");
            registry.remove(id);
        }
    }
    tracker.clear();
    registry.validate_sessions();
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
