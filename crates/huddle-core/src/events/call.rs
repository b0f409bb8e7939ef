//! Call signaling wire events.
//!
//! Every payload crossing a pub/sub channel is an [`Envelope`] wrapping a
//! tagged [`SignalEvent`]. The envelope carries an explicit wire version;
//! receivers silently drop envelopes from a future version instead of
//! erroring.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{CallTarget, UserId};

/// Current wire format version.
pub const WIRE_VERSION: u32 = 1;

/// Versioned wrapper around every signaling payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Wire format version.
    pub v: u32,
    /// The event payload.
    pub event: SignalEvent,
}

impl Envelope {
    /// Wrap an event at the current wire version.
    pub fn new(event: SignalEvent) -> Self {
        Self {
            v: WIRE_VERSION,
            event,
        }
    }

    /// Whether this receiver understands the envelope's version.
    pub fn is_compatible(&self) -> bool {
        self.v <= WIRE_VERSION
    }
}

/// Events exchanged on invitation channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalEvent {
    /// Ring the target. Re-published on every resend tick.
    Invitation(CallInvitation),
    /// A receiver answered; the only way the sender learns the ring landed.
    Accepted {
        /// Target whose ring was answered.
        target: CallTarget,
        /// The answering user.
        user_id: UserId,
    },
    /// The call for this target is over; clears pending rings everywhere.
    Ended {
        /// Target whose call ended.
        target: CallTarget,
        /// The user that ended the call.
        user_id: UserId,
    },
}

/// An unacknowledged broadcast message representing "ring this target".
///
/// Never persisted; its only existence is as in-flight channel payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallInvitation {
    /// The calling user.
    pub caller_id: UserId,
    /// Caller display name, resolved at send time.
    pub caller_display_name: String,
    /// Caller avatar URL, if any.
    pub caller_avatar: Option<String>,
    /// The ringing target.
    pub target: CallTarget,
    /// Target display name shown on the incoming-call surface.
    pub target_display_name: String,
    /// Whether the caller wants video.
    pub is_video: bool,
    /// Epoch milliseconds at which the invitation was first issued.
    /// Resends keep the original value so receivers can age it out.
    pub issued_at: i64,
}

impl CallInvitation {
    /// Age of the invitation in milliseconds at wall-clock `now`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.issued_at
    }

    /// Current epoch milliseconds.
    pub fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationId;

    fn invitation() -> CallInvitation {
        CallInvitation {
            caller_id: UserId::new(),
            caller_display_name: "Aki Tanaka".to_string(),
            caller_avatar: None,
            target: CallTarget::Conversation(ConversationId::new()),
            target_display_name: "design-sync".to_string(),
            is_video: true,
            issued_at: CallInvitation::now_ms(),
        }
    }

    #[test]
    fn test_envelope_wire_shape() {
        let env = Envelope::new(SignalEvent::Invitation(invitation()));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["v"], 1);
        assert_eq!(json["event"]["type"], "invitation");
    }

    #[test]
    fn test_envelope_roundtrip() {
        let env = Envelope::new(SignalEvent::Ended {
            target: CallTarget::User(UserId::new()),
            user_id: UserId::new(),
        });
        let parsed: Envelope = serde_json::from_str(&serde_json::to_string(&env).unwrap()).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn test_future_version_is_incompatible() {
        let mut env = Envelope::new(SignalEvent::Invitation(invitation()));
        env.v = WIRE_VERSION + 1;
        assert!(!env.is_compatible());
    }
}
