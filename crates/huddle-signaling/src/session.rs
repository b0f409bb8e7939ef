//! Client-local call session state, per target.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use huddle_core::types::CallTarget;

/// Where a call with a given target currently stands on this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSessionState {
    /// No call activity for the target.
    #[default]
    Idle,
    /// This client is ringing the target.
    RingingOutbound,
    /// The target's invitation is pending on this client.
    RingingInbound,
    /// A call with the target is active.
    Accepted,
}

/// Per-target session state map.
#[derive(Debug, Default)]
pub struct SessionMap {
    sessions: DashMap<CallTarget, CallSessionState>,
}

impl SessionMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for a target; `Idle` when untracked.
    pub fn state(&self, target: &CallTarget) -> CallSessionState {
        self.sessions
            .get(target)
            .map(|s| *s.value())
            .unwrap_or_default()
    }

    /// Transition a target. `Idle` removes the entry so the map only
    /// holds active call state.
    pub fn set(&self, target: CallTarget, state: CallSessionState) {
        if state == CallSessionState::Idle {
            self.sessions.remove(&target);
        } else {
            self.sessions.insert(target, state);
        }
    }

    /// Targets with any non-idle call state.
    pub fn active_targets(&self) -> Vec<CallTarget> {
        self.sessions.iter().map(|s| *s.key()).collect()
    }
}
