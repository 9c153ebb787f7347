//! Per-connection session worker
//!
//! One worker per accepted connection drives the request state machine:
//! registration (looping on name conflicts), the readiness handshake, then
//! the active command/message loop. The worker owns all per-session state
//! other tasks never touch directly — routing mode, private recipient,
//! lifecycle state — and consumes decoded lines from its inbox channel,
//! suspending until input arrives or a forced close is requested.

use std::sync::{Arc, OnceLock};

use linechat_core::protocol::{self, tokens, ChatCommand, ClientRequest};
use linechat_core::{
    MessageMode, ProtocolError, ProtocolResult, SessionId, SessionRole, SessionState, TimingConfig,
};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

use crate::liveness::{self, PingTracker};
use crate::registry::{RegisterOutcome, Registry};
use crate::router::Router;
use crate::session::SessionHandle;

/// State machine for one connected client.
pub struct SessionWorker {
    id: SessionId,
    state: SessionState,
    mode: MessageMode,
    private_target: Option<SessionId>,
    handle: SessionHandle,
    closer: Arc<Notify>,
    inbox: mpsc::UnboundedReceiver<String>,
    name: Arc<OnceLock<String>>,
    registry: Arc<Registry>,
    router: Router,
    tracker: Arc<PingTracker>,
    timing: TimingConfig,
}

impl SessionWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        handle: SessionHandle,
        inbox: mpsc::UnboundedReceiver<String>,
        name: Arc<OnceLock<String>>,
        registry: Arc<Registry>,
        router: Router,
        tracker: Arc<PingTracker>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            id: handle.id(),
            state: SessionState::Connecting,
            mode: MessageMode::default(),
            private_target: None,
            closer: handle.closer(),
            handle,
            inbox,
            name,
            registry,
            router,
            tracker,
            timing,
        }
    }

    /// Drive the session to completion. Always leaves the registry without
    /// this session and the state machine in its terminal state.
    pub async fn run(mut self) {
        match self.handshake().await {
            Ok(()) => {
                self.state = SessionState::Active;
                self.activate();
                self.process_requests().await;
            }
            Err(ProtocolError::ConnectionClosed) => {
                debug!(id = %self.id, "connection closed during handshake");
            }
            Err(err) => {
                warn!(id = %self.id, %err, "handshake failed, closing session");
            }
        }

        self.state = SessionState::Closing;
        self.registry.remove(self.id);
        self.state = SessionState::Closed;
        debug!(id = %self.id, "session worker finished");
    }

    /// Registration loop and readiness handshake.
    async fn handshake(&mut self) -> ProtocolResult<()> {
        self.state = SessionState::Registering;
        loop {
            let proposal = self.next_line().await?;
            match self.registry.try_register(self.handle.clone(), &proposal) {
                RegisterOutcome::NameTaken => {
                    self.handle.send(tokens::NAME_TAKEN);
                }
                RegisterOutcome::Accepted => {
                    let _ = self.name.set(proposal);
                    self.handle.send(tokens::NAME_ACCEPTED);
                    break;
                }
            }
        }

        self.state = SessionState::AwaitingReady;
        let line = self.next_line().await?;
        if line != tokens::READY {
            return Err(ProtocolError::HandshakeViolation {
                expected: tokens::READY,
                got: line,
            });
        }
        Ok(())
    }

    /// Entry into normal traffic: claim the coordinator role if vacant,
    /// then greet the client.
    fn activate(&mut self) {
        self.registry.ensure_coordinator(self.id);

        for line in protocol::COMMAND_HELP {
            self.handle.send(*line);
        }
        self.send_mode_notice();
        self.handle.send("");
        self.handle.send("Welcome to the chat!");
        self.handle
            .send(format!("Number of users in chat: {}", self.registry.user_count()));
        if let Some(summary) = self.registry.coordinator_summary() {
            self.handle.send(summary);
        }
    }

    /// The active request loop. Ends on quit, connection loss, or a forced
    /// close from the registry.
    async fn process_requests(&mut self) {
        loop {
            let line = match self.next_line().await {
                Ok(line) => line,
                Err(_) => break,
            };
            match ClientRequest::parse(&line) {
                ClientRequest::Command(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                ClientRequest::PingRoundStart => self.run_heartbeat_round().await,
                ClientRequest::Chat(text) => self.route_chat(&text),
            }
        }
    }

    /// Returns false when the session should close (graceful quit).
    fn handle_command(&mut self, command: ChatCommand) -> bool {
        match command {
            ChatCommand::Help => {
                for line in protocol::COMMAND_HELP {
                    self.handle.send(*line);
                }
            }
            ChatCommand::Coordinator => {
                if let Some(summary) = self.registry.coordinator_summary() {
                    self.handle.send(summary);
                }
            }
            ChatCommand::Online => {
                for line in self.registry.roster_lines() {
                    self.handle.send(line);
                }
            }
            ChatCommand::Broadcast => {
                self.mode = MessageMode::Broadcast;
                self.send_mode_notice();
            }
            ChatCommand::Private { target } => match self.registry.find_by_name(&target) {
                None => {
                    self.handle.send(protocol::TARGET_NOT_FOUND);
                }
                Some(target_id) => {
                    self.private_target = Some(target_id);
                    self.mode = MessageMode::Private;
                    self.send_mode_notice();
                }
            },
            ChatCommand::Quit => {
                self.handle.send(tokens::QUIT_SUCCESS);
                return false;
            }
            ChatCommand::Unknown => {
                self.handle.send(protocol::INVALID_COMMAND);
            }
        }
        true
    }

    fn route_chat(&mut self, text: &str) {
        match self.mode {
            MessageMode::Broadcast => self.router.broadcast(self.id, text),
            MessageMode::Private => {
                self.router.private_message(self.id, self.private_target, text)
            }
        }
    }

    /// Heartbeat rounds are only honored from the session that actually
    /// holds the coordinator role.
    async fn run_heartbeat_round(&mut self) {
        if self.registry.role_of(self.id) != Some(SessionRole::Coordinator) {
            warn!(id = %self.id, "ignoring heartbeat round from non-coordinator");
            return;
        }
        liveness::run_round(
            &self.registry,
            &self.tracker,
            &mut self.inbox,
            self.timing.ping_timeout(),
        )
        .await;
    }

    fn send_mode_notice(&self) {
        match self.mode {
            MessageMode::Broadcast => {
                self.handle.send("=== Switched to broadcast mode! ===");
            }
            MessageMode::Private => {
                self.handle.send("=== Switched to private message mode! ===");
                let recipient = self
                    .private_target
                    .and_then(|id| self.registry.name_of(id))
                    .unwrap_or_default();
                self.handle
                    .send(format!("=== Current private recipient: {} ===", recipient));
            }
        }
    }

    /// Next decoded line, or an error when the connection is gone or a
    /// forced close was requested. Blocks on the inbox; never polls.
    async fn next_line(&mut self) -> ProtocolResult<String> {
        tokio::select! {
            line = self.inbox.recv() => line.ok_or(ProtocolError::ConnectionClosed),
            _ = self.closer.notified() => Err(ProtocolError::ConnectionClosed),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> SessionState {
        self.state
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
