//! Call signaling configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Call invitation protocol and transport mode selector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingConfig {
    /// Interval between invitation re-publishes in seconds.
    #[serde(default = "default_resend_interval")]
    pub resend_interval_seconds: u64,
    /// Total publish attempts per ring (first publish included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Maximum invitation age a receiver will still surface, in seconds.
    #[serde(default = "default_invite_max_age")]
    pub invite_max_age_seconds: u64,
    /// How long an accepted target suppresses duplicate invitations,
    /// in seconds.
    #[serde(default = "default_accept_dedup_ttl")]
    pub accept_dedup_ttl_seconds: u64,
    /// Largest participant count the mesh topology is allowed to carry.
    #[serde(default = "default_mesh_limit")]
    pub mesh_participant_limit: usize,
    /// How long the mode selector waits for a membership sync event
    /// before defaulting to mesh, in milliseconds.
    #[serde(default = "default_decision_timeout")]
    pub decision_timeout_ms: u64,
}

impl SignalingConfig {
    /// Resend interval as a [`Duration`].
    pub fn resend_interval(&self) -> Duration {
        Duration::from_secs(self.resend_interval_seconds)
    }

    /// Invitation max age in milliseconds, for `issued_at` math.
    pub fn invite_max_age_ms(&self) -> i64 {
        (self.invite_max_age_seconds * 1000) as i64
    }

    /// De-dup TTL as a [`Duration`].
    pub fn accept_dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.accept_dedup_ttl_seconds)
    }

    /// Decision timeout as a [`Duration`].
    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            resend_interval_seconds: default_resend_interval(),
            max_attempts: default_max_attempts(),
            invite_max_age_seconds: default_invite_max_age(),
            accept_dedup_ttl_seconds: default_accept_dedup_ttl(),
            mesh_participant_limit: default_mesh_limit(),
            decision_timeout_ms: default_decision_timeout(),
        }
    }
}

fn default_resend_interval() -> u64 {
    3
}

fn default_max_attempts() -> u32 {
    10
}

fn default_invite_max_age() -> u64 {
    45
}

fn default_accept_dedup_ttl() -> u64 {
    120
}

fn default_mesh_limit() -> usize {
    5
}

fn default_decision_timeout() -> u64 {
    2000
}
