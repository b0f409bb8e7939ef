//! Presence status and the per-user presence record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// User presence status as stored in the presence row.
///
/// Readers must never trust this value directly; derive the effective
/// status through [`PresenceRecord::effective_status`], which folds in
/// heartbeat staleness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// User is reachable and recently active.
    Online,
    /// User is connected but idle.
    Idle,
    /// Do not disturb (manual override).
    Dnd,
    /// User is in an active call.
    InCall,
    /// User is in a scheduled meeting.
    InMeeting,
    /// User is not reachable.
    Offline,
}

impl PresenceStatus {
    /// Parses from a string with a default fallback.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "online" => Self::Online,
            "idle" => Self::Idle,
            "dnd" | "do_not_disturb" => Self::Dnd,
            "in_call" => Self::InCall,
            "in_meeting" => Self::InMeeting,
            "offline" => Self::Offline,
            _ => Self::Online,
        }
    }

    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::InCall => "in_call",
            Self::InMeeting => "in_meeting",
            Self::Offline => "offline",
        }
    }
}

/// User-set status override. Persists until explicitly cleared and
/// outranks every derived signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualOverride {
    /// No override; status is derived.
    #[default]
    None,
    /// Do not disturb.
    Dnd,
}

/// One presence row per user.
///
/// Single-writer: only the owning client upserts its own record. All
/// other clients are read-only subscribers of the change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// Owning user.
    pub user_id: UserId,
    /// Stored status as published by the owner's last heartbeat.
    pub status: PresenceStatus,
    /// User-set override, if any.
    #[serde(default)]
    pub manual_override: ManualOverride,
    /// Timestamp of the owner's last heartbeat write.
    pub last_seen_at: DateTime<Utc>,
}

impl PresenceRecord {
    /// Effective status at `now`: `Offline` when the last heartbeat is
    /// older than `stale_window`, else the stored status.
    pub fn effective_status(&self, now: DateTime<Utc>, stale_window: Duration) -> PresenceStatus {
        if now - self.last_seen_at > stale_window {
            PresenceStatus::Offline
        } else {
            self.status
        }
    }
}
