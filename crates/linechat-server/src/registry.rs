//! Shared session registry and coordinator election
//!
//! The registry is the only process-wide mutable structure: a table of all
//! registered sessions plus the identity of the current coordinator. Every
//! mutation — registration, removal, election — happens under one internal
//! lock, together with the notifications it implies, so no caller ever
//! observes registry state mid-mutation. The raw map is never exposed;
//! callers get point-in-time snapshots.
//!
//! Delivery failures discovered while walking the table are handled here
//! too: a recipient whose outbox is gone is treated as disconnected and
//! removed, with the same departure/re-election side effects as an explicit
//! quit. Removal uses an iterative worklist so cascading failures (the
//! departure notice itself failing for another dead peer) stay in the same
//! critical section instead of recursing.

use std::collections::HashMap;
use std::sync::Mutex;

use linechat_core::protocol::{self, tokens};
use linechat_core::{RandomSource, SessionId, SessionRole};
use tracing::{debug, info};

use crate::session::SessionHandle;

// ----------------------------------------------------------------------------
// Registration Outcome
// ----------------------------------------------------------------------------

/// Result of an atomic check-and-insert registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Name was unique; the session is now registered.
    Accepted,
    /// Name collides with an active session; propose another.
    NameTaken,
}

// ----------------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------------

struct Member {
    name: String,
    handle: SessionHandle,
}

struct RegistryInner {
    sessions: HashMap<SessionId, Member>,
    coordinator: Option<SessionId>,
    rng: Box<dyn RandomSource>,
}

/// Process-wide table of registered sessions.
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                sessions: HashMap::new(),
                coordinator: None,
                rng,
            }),
        }
    }

    /// Atomic check-and-insert. On acceptance the join notice goes out to
    /// every already-registered session before the newcomer is inserted,
    /// so the newcomer never sees its own join.
    pub fn try_register(&self, handle: SessionHandle, name: &str) -> RegisterOutcome {
        let mut inner = self.inner.lock().unwrap();
        if inner.sessions.values().any(|m| m.name == name) {
            return RegisterOutcome::NameTaken;
        }

        let mut dead = Vec::new();
        Self::fan_out_inner(&inner, None, &protocol::joined_notice(name), &mut dead);
        let id = handle.id();
        inner.sessions.insert(
            id,
            Member {
                name: name.to_string(),
                handle,
            },
        );
        info!(%id, name, "session registered");
        Self::drain_dead(&mut inner, dead);
        RegisterOutcome::Accepted
    }

    /// Remove a session: departure notice, coordinator re-election if it
    /// held the role, roster push. Idempotent for unknown ids.
    pub fn remove(&self, id: SessionId) {
        let mut inner = self.inner.lock().unwrap();
        Self::drain_dead(&mut inner, vec![id]);
    }

    /// Re-run the election: pick uniformly among members other than the
    /// sitting coordinator, push the roster, and signal the winner.
    pub fn elect_coordinator(&self) {
        let mut inner = self.inner.lock().unwrap();
        let mut dead = Vec::new();
        Self::elect_inner(&mut inner, &mut dead);
        Self::drain_dead(&mut inner, dead);
    }

    /// Called on first activation: the calling session takes the
    /// coordinator role if none is held, otherwise the sitting coordinator
    /// gets a refreshed roster (membership just changed).
    pub fn ensure_coordinator(&self, id: SessionId) {
        let mut inner = self.inner.lock().unwrap();
        let mut dead = Vec::new();
        if inner.coordinator.is_none() {
            Self::set_coordinator_inner(&mut inner, id, &mut dead);
        } else {
            Self::push_roster_inner(&inner, &mut dead);
        }
        Self::drain_dead(&mut inner, dead);
    }

    /// Sweep sessions whose connection is already gone (writer shut down),
    /// with full removal side effects, then refresh the coordinator's
    /// roster.
    pub fn validate_sessions(&self) {
        let mut inner = self.inner.lock().unwrap();
        let dead: Vec<SessionId> = inner
            .sessions
            .iter()
            .filter(|(_, m)| m.handle.is_closed())
            .map(|(id, _)| *id)
            .collect();
        Self::drain_dead(&mut inner, dead);
        let mut dead = Vec::new();
        Self::push_roster_inner(&inner, &mut dead);
        Self::drain_dead(&mut inner, dead);
    }

    /// Queue a line to one session. On failure the recipient is removed
    /// (disconnect semantics) and false is returned; the caller's walk
    /// continues.
    pub fn deliver(&self, id: SessionId, line: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(member) = inner.sessions.get(&id) else {
            return false;
        };
        if member.handle.send(line) {
            true
        } else {
            Self::drain_dead(&mut inner, vec![id]);
            false
        }
    }

    /// Queue a line to every registered session except `exclude`.
    pub fn fan_out_excluding(&self, exclude: SessionId, line: &str) {
        let mut inner = self.inner.lock().unwrap();
        let mut dead = Vec::new();
        Self::fan_out_inner(&inner, Some(exclude), line, &mut dead);
        Self::drain_dead(&mut inner, dead);
    }

    /// Point-in-time copy of the registered names.
    pub fn snapshot_names(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.sessions.values().map(|m| m.name.clone()).collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<SessionId> {
        let inner = self.inner.lock().unwrap();
        inner
            .sessions
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(id, _)| *id)
    }

    pub fn name_of(&self, id: SessionId) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.sessions.get(&id).map(|m| m.name.clone())
    }

    pub fn role_of(&self, id: SessionId) -> Option<SessionRole> {
        let inner = self.inner.lock().unwrap();
        inner.sessions.contains_key(&id).then(|| {
            if inner.coordinator == Some(id) {
                SessionRole::Coordinator
            } else {
                SessionRole::Member
            }
        })
    }

    pub fn coordinator(&self) -> Option<SessionId> {
        self.inner.lock().unwrap().coordinator
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    /// Human-readable line naming the current coordinator and its address.
    pub fn coordinator_summary(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        let id = inner.coordinator?;
        let member = inner.sessions.get(&id)?;
        let addr = member.handle.addr();
        Some(format!(
            "The current coordinator is: {}. IP: {}  PORT: {}",
            member.name,
            addr.ip(),
            addr.port()
        ))
    }

    /// The `!online` table: one header plus one row per session.
    pub fn roster_lines(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut lines = vec!["  IP               |  Port   |  Name".to_string()];
        for (id, member) in &inner.sessions {
            let mut name = member.name.clone();
            if inner.coordinator == Some(*id) {
                name.push_str(" (coordinator)");
            }
            let addr = member.handle.addr();
            lines.push(format!(
                "  {:<15}  |  {:<5}  |  {}",
                addr.ip().to_string(),
                addr.port(),
                name
            ));
        }
        lines
    }

    /// Ask every registered session's worker to shut down. Used on
    /// listener teardown; the workers unregister themselves as they exit.
    pub fn close_all(&self) {
        let inner = self.inner.lock().unwrap();
        for member in inner.sessions.values() {
            member.handle.request_close();
        }
    }

    // ------------------------------------------------------------------------
    // Locked helpers
    //
    // All helpers operate on the already-locked inner state. Sends are
    // non-blocking enqueues, so notifications stay inside the critical
    // section and observe the same serialization as the mutation itself.
    // ------------------------------------------------------------------------

    fn drain_dead(inner: &mut RegistryInner, mut dead: Vec<SessionId>) {
        while let Some(id) = dead.pop() {
            Self::remove_inner(inner, id, &mut dead);
        }
    }

    fn remove_inner(inner: &mut RegistryInner, id: SessionId, dead: &mut Vec<SessionId>) {
        let Some(member) = inner.sessions.remove(&id) else {
            return;
        };
        member.handle.request_close();
        info!(%id, name = %member.name, "session removed");
        Self::fan_out_inner(inner, None, &protocol::left_notice(&member.name), dead);

        // The coordinator check happens here, under the same lock, so a
        // target promoted mid-heartbeat-round still re-elects on removal.
        if inner.coordinator == Some(id) {
            inner.coordinator = None;
            if Self::elect_inner(inner, dead) {
                let new_name = inner
                    .coordinator
                    .and_then(|cid| inner.sessions.get(&cid))
                    .map(|m| m.name.clone());
                if let Some(name) = new_name {
                    Self::fan_out_inner(
                        inner,
                        None,
                        &protocol::coordinator_changed_notice(&name),
                        dead,
                    );
                }
            }
        } else {
            Self::push_roster_inner(inner, dead);
        }
    }

    /// Returns true when a new coordinator was assigned.
    fn elect_inner(inner: &mut RegistryInner, dead: &mut Vec<SessionId>) -> bool {
        let candidates: Vec<SessionId> = inner
            .sessions
            .keys()
            .copied()
            .filter(|id| Some(*id) != inner.coordinator)
            .collect();
        if candidates.is_empty() {
            if inner.sessions.is_empty() {
                inner.coordinator = None;
            }
            return false;
        }
        let chosen = candidates[inner.rng.pick(candidates.len())];
        Self::set_coordinator_inner(inner, chosen, dead);
        true
    }

    fn set_coordinator_inner(inner: &mut RegistryInner, id: SessionId, dead: &mut Vec<SessionId>) {
        inner.coordinator = Some(id);
        debug!(%id, "coordinator assigned");
        Self::push_roster_inner(inner, dead);
        if let Some(member) = inner.sessions.get(&id) {
            if !member.handle.send(tokens::NEW_COORDINATOR) {
                dead.push(id);
            }
        }
    }

    fn push_roster_inner(inner: &RegistryInner, dead: &mut Vec<SessionId>) {
        let Some(id) = inner.coordinator else {
            return;
        };
        let Some(coordinator) = inner.sessions.get(&id) else {
            return;
        };
        let mut delivered = coordinator.handle.send(tokens::NAMES_BEGIN);
        for member in inner.sessions.values() {
            delivered &= coordinator.handle.send(member.name.as_str());
        }
        delivered &= coordinator.handle.send(tokens::NAMES_END);
        if !delivered {
            dead.push(id);
        }
    }

    fn fan_out_inner(
        inner: &RegistryInner,
        exclude: Option<SessionId>,
        line: &str,
        dead: &mut Vec<SessionId>,
    ) {
        for (id, member) in &inner.sessions {
            if Some(*id) == exclude {
                continue;
            }
            if !member.handle.send(line) {
                dead.push(*id);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
