//! Call session domain types (spec §3 "Call Session", §4.1 state machine).

use crate::ids::{AgentProfileId, CallId, TenantId};
use std::time::{Duration, Instant};

pub const DEFAULT_HARD_DEADLINE: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_GRACE_DRAIN: Duration = Duration::from_millis(500);

/// Session-level state machine (spec §4.1). Distinct from the Turn
/// Controller's conversational state machine (spec §4.5) — this tracks the
/// lifecycle of the call itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Ready,
    Active,
    Draining,
    Aborting,
    Ended,
}

impl SessionState {
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Initializing, Ready)
                | (Ready, Active)
                | (Active, Draining)
                | (Draining, Ended)
                | (Initializing, Aborting)
                | (Ready, Aborting)
                | (Active, Aborting)
                | (Draining, Aborting)
                | (Aborting, Ended)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    CallerHangup,
    AgentInitiated,
    DeadlineExpired,
    UnrecoverableFailure,
}

/// Static identity and configuration for a call, fixed at `accept_call`.
#[derive(Debug, Clone)]
pub struct CallMeta {
    pub call_id: CallId,
    pub tenant_id: TenantId,
    pub agent_profile_id: AgentProfileId,
    pub started_at: Instant,
    pub hard_deadline: Duration,
}

impl CallMeta {
    pub fn new(tenant_id: TenantId, agent_profile_id: AgentProfileId) -> Self {
        Self {
            call_id: CallId::new(),
            tenant_id,
            agent_profile_id,
            started_at: Instant::now(),
            hard_deadline: DEFAULT_HARD_DEADLINE,
        }
    }

    pub fn deadline_expired(&self) -> bool {
        self.started_at.elapsed() >= self.hard_deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
