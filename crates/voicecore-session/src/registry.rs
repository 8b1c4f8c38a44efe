//! Call registry: a `DashMap`-backed process lookup keyed by `CallId`,
//! shared by the admin/status HTTP surface and the supervisor's own
//! teardown path. A plain `RwLock<HashMap<_>>` (the teacher's
//! `InMemorySessionStore`) serializes every lookup behind one lock; a
//! concurrent telephony server fields many calls at once and a sharded map
//! avoids that single point of contention.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use voicecore_core::ids::{AgentProfileId, CallId, TenantId};
use voicecore_core::session::{CallMeta, SessionState};
use voicecore_events::CallEndReason;

/// What the registry holds per active call: enough to answer admin queries
/// and to cancel the call's task tree on teardown.
pub struct CallHandle {
    pub meta: CallMeta,
    pub state: Arc<parking_lot::Mutex<SessionState>>,
    pub cancel: CancellationToken,
    /// Set by whichever path (hard deadline, an unrecoverable stage
    /// failure, an operator-initiated `end_call`) decides *why* the call
    /// is ending, before cancelling. The teardown tail reads and clears
    /// it, falling back to its own hangup/deadline heuristic if nothing
    /// set it first.
    pub end_reason: Arc<parking_lot::Mutex<Option<CallEndReason>>>,
}

impl CallHandle {
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Attempt a session-state transition, honoring `SessionState`'s own
    /// transition table (spec §4.1). No-op if the transition isn't legal.
    pub fn transition_to(&self, next: SessionState) -> bool {
        let mut guard = self.state.lock();
        if guard.can_transition_to(next) {
            *guard = next;
            true
        } else {
            false
        }
    }
}

/// Snapshot returned to admin/status callers, decoupled from the live
/// `CallHandle` so callers can't reach into the registry's internals.
#[derive(Debug, Clone)]
pub struct CallStatus {
    pub call_id: CallId,
    pub tenant_id: TenantId,
    pub agent_profile_id: AgentProfileId,
    pub state: SessionState,
    pub elapsed: Duration,
}

#[derive(Clone, Default)]
pub struct CallRegistry {
    calls: Arc<DashMap<CallId, CallHandle>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: CallHandle) {
        self.calls.insert(handle.meta.call_id.clone(), handle);
    }

    pub fn remove(&self, call_id: &CallId) -> Option<CallHandle> {
        self.calls.remove(call_id).map(|(_, handle)| handle)
    }

    pub fn status(&self, call_id: &CallId) -> Option<CallStatus> {
        self.calls.get(call_id).map(|entry| CallStatus {
            call_id: entry.meta.call_id.clone(),
            tenant_id: entry.meta.tenant_id.clone(),
            agent_profile_id: entry.meta.agent_profile_id.clone(),
            state: entry.state(),
            elapsed: entry.meta.elapsed(),
        })
    }

    pub fn cancel(&self, call_id: &CallId) -> bool {
        self.cancel_with_reason(call_id, CallEndReason::CallerHangup)
    }

    /// Cancel the call's task tree, recording why it ended for the
    /// teardown tail to report in `CallEnded` (spec §4.8).
    pub fn cancel_with_reason(&self, call_id: &CallId, reason: CallEndReason) -> bool {
        match self.calls.get(call_id) {
            Some(entry) => {
                *entry.end_reason.lock() = Some(reason);
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn active_call_ids(&self) -> Vec<CallId> {
        self.calls.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicecore_core::session::SessionState;

    fn handle(call_id: CallId) -> CallHandle {
        let mut meta = CallMeta::new(TenantId::new(), AgentProfileId::new());
        meta.call_id = call_id;
        CallHandle {
            meta,
            state: Arc::new(parking_lot::Mutex::new(SessionState::Initializing)),
            cancel: CancellationToken::new(),
            end_reason: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    #[test]
    fn insert_and_status_round_trip() {
        let registry = CallRegistry::new();
        let call_id = CallId::new();
        registry.insert(handle(call_id.clone()));

        let status = registry.status(&call_id).expect("present");
        assert_eq!(status.call_id, call_id);
        assert_eq!(status.state, SessionState::Initializing);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn transition_respects_state_machine() {
        let registry = CallRegistry::new();
        let call_id = CallId::new();
        registry.insert(handle(call_id.clone()));
        let entry = registry.calls.get(&call_id).unwrap();
        assert!(entry.transition_to(SessionState::Ready));
        assert!(!entry.transition_to(SessionState::Ended));
        assert_eq!(entry.state(), SessionState::Ready);
    }

    #[test]
    fn cancel_signals_the_call_token_and_remove_drops_it() {
        let registry = CallRegistry::new();
        let call_id = CallId::new();
        registry.insert(handle(call_id.clone()));
        assert!(registry.cancel(&call_id));

        let removed = registry.remove(&call_id).expect("present");
        assert!(removed.cancel.is_cancelled());
        assert!(registry.is_empty());
    }
}
