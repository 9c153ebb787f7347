//! Chat message routing
//!
//! Renders chat payloads with their timestamp/sender prefix and fans them
//! out through the registry. Per-recipient failures are disconnects handled
//! by the registry; they never surface to the sender.

use std::sync::Arc;

use linechat_core::protocol;
use linechat_core::{Clock, SessionId};

use crate::registry::Registry;

/// Routes chat payloads from active sessions to their recipients.
#[derive(Clone)]
pub struct Router {
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
}

impl Router {
    pub fn new(registry: Arc<Registry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// Deliver `text` to every active session except the sender.
    pub fn broadcast(&self, sender: SessionId, text: &str) {
        let Some(name) = self.registry.name_of(sender) else {
            return;
        };
        let line = protocol::format_broadcast(self.clock.as_ref(), &name, text);
        self.registry.fan_out_excluding(sender, &line);
    }

    /// Deliver `text` to the sender's chosen private recipient, echoing the
    /// rendered line back to the sender. With no recipient selected the
    /// sender gets a local notice and nothing else happens.
    pub fn private_message(&self, sender: SessionId, target: Option<SessionId>, text: &str) {
        let Some(name) = self.registry.name_of(sender) else {
            return;
        };
        let Some(target) = target else {
            self.registry.deliver(sender, protocol::NO_RECIPIENT);
            return;
        };
        let line = protocol::format_private(self.clock.as_ref(), &name, text);
        self.registry.deliver(target, &line);
        self.registry.deliver(sender, &line);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
