//! Presence and heartbeat configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Liveness heartbeat and status resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Interval between heartbeat upserts in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Maximum heartbeat age before readers infer offline, in seconds.
    #[serde(default = "default_stale_window")]
    pub stale_window_seconds: u64,
    /// Inactivity span after which the local status flips to idle,
    /// in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

impl PresenceConfig {
    /// Heartbeat interval as a [`Duration`].
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// Staleness window as a [`chrono::Duration`] for record math.
    pub fn stale_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_window_seconds as i64)
    }

    /// Idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: default_heartbeat_interval(),
            stale_window_seconds: default_stale_window(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    8
}

fn default_stale_window() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    300
}
