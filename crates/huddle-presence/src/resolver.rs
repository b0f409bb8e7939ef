//! Manual/derived status resolution.
//!
//! Combines three independent signals into the single status value the
//! heartbeat publishes, in fixed priority order:
//! manual DND > in-call > in-meeting > idle > online.

use std::time::Duration;

use tokio::time::Instant;

use huddle_core::types::{ManualOverride, PresenceStatus};

/// Resolves the local user's published status from manual overrides,
/// call activity, and input-derived idleness.
#[derive(Debug)]
pub struct StatusResolver {
    /// User-set do-not-disturb; persists until explicitly cleared.
    manual_dnd: bool,
    /// Set by the call subsystem while a session is active.
    in_call: bool,
    /// Set by the meetings subsystem while a meeting is active.
    in_meeting: bool,
    /// Monotonic timestamp of the last observed activity signal.
    last_activity: Instant,
    /// Inactivity span after which the derived status flips to idle.
    idle_timeout: Duration,
}

impl StatusResolver {
    /// Create a resolver that starts active.
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            manual_dnd: false,
            in_call: false,
            in_meeting: false,
            last_activity: Instant::now(),
            idle_timeout,
        }
    }

    /// The status to publish right now.
    pub fn resolve(&self) -> PresenceStatus {
        if self.manual_dnd {
            PresenceStatus::Dnd
        } else if self.in_call {
            PresenceStatus::InCall
        } else if self.in_meeting {
            PresenceStatus::InMeeting
        } else if self.is_idle() {
            PresenceStatus::Idle
        } else {
            PresenceStatus::Online
        }
    }

    /// The manual override to store alongside the status.
    pub fn manual_override(&self) -> ManualOverride {
        if self.manual_dnd {
            ManualOverride::Dnd
        } else {
            ManualOverride::None
        }
    }

    /// Whether the inactivity timer has elapsed.
    pub fn is_idle(&self) -> bool {
        self.last_activity.elapsed() >= self.idle_timeout
    }

    /// Record an activity signal (pointer press, key press, touch,
    /// scroll). Returns `true` when this flipped the derived state out
    /// of idle, so the caller can force-publish instead of waiting for
    /// the next heartbeat tick.
    pub fn record_activity(&mut self) -> bool {
        let was_idle = self.is_idle();
        self.last_activity = Instant::now();
        was_idle && !self.manual_dnd && !self.in_call && !self.in_meeting
    }

    /// Set or clear the manual DND override.
    pub fn set_manual_dnd(&mut self, dnd: bool) {
        self.manual_dnd = dnd;
    }

    /// Set or clear the in-call flag. Ignored while manual DND is set,
    /// since DND outranks it; returns whether the flag was applied.
    pub fn set_in_call(&mut self, active: bool) -> bool {
        if self.manual_dnd {
            return false;
        }
        self.in_call = active;
        true
    }

    /// Set or clear the in-meeting flag. Ignored while manual DND is set.
    pub fn set_in_meeting(&mut self, active: bool) -> bool {
        if self.manual_dnd {
            return false;
        }
        self.in_meeting = active;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn test_default_is_online() {
        let resolver = StatusResolver::new(IDLE);
        assert_eq!(resolver.resolve(), PresenceStatus::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_after_timeout() {
        let resolver = StatusResolver::new(IDLE);
        tokio::time::advance(IDLE).await;
        assert_eq!(resolver.resolve(), PresenceStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_flips_back_to_online() {
        let mut resolver = StatusResolver::new(IDLE);
        tokio::time::advance(IDLE).await;
        assert_eq!(resolver.resolve(), PresenceStatus::Idle);

        assert!(resolver.record_activity());
        assert_eq!(resolver.resolve(), PresenceStatus::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dnd_outranks_idle_and_in_call() {
        let mut resolver = StatusResolver::new(IDLE);
        resolver.set_manual_dnd(true);

        tokio::time::advance(IDLE * 2).await;
        assert_eq!(resolver.resolve(), PresenceStatus::Dnd);

        assert!(!resolver.set_in_call(true));
        assert_eq!(resolver.resolve(), PresenceStatus::Dnd);
        assert_eq!(resolver.manual_override(), ManualOverride::Dnd);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_call_outranks_idle() {
        let mut resolver = StatusResolver::new(IDLE);
        assert!(resolver.set_in_call(true));
        tokio::time::advance(IDLE).await;
        assert_eq!(resolver.resolve(), PresenceStatus::InCall);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_dnd_restores_derived_status() {
        let mut resolver = StatusResolver::new(IDLE);
        resolver.set_manual_dnd(true);
        resolver.set_manual_dnd(false);
        assert_eq!(resolver.resolve(), PresenceStatus::Online);
        assert_eq!(resolver.manual_override(), ManualOverride::None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_while_active_is_not_a_transition() {
        let mut resolver = StatusResolver::new(IDLE);
        assert!(!resolver.record_activity());
    }
}
