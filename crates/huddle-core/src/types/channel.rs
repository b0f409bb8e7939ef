//! Channel naming scheme and parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{ConversationId, RoomId, TeamId, UserId};

/// An opaque pub/sub channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Wrap a raw channel string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The channel name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ChannelKind> for ChannelName {
    fn from(kind: ChannelKind) -> Self {
        kind.to_channel_name()
    }
}

/// Typed channel identifiers.
///
/// Fan-out is one channel per addressable target: a direct call rings the
/// recipient's personal channel, conversation and team calls ring one
/// shared channel that every member joins ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Personal user channel, direct call invitations.
    Personal(UserId),
    /// Conversation call channel, invitations for a group conversation.
    CallInvite(ConversationId),
    /// Team call channel, invitations for a whole team.
    TeamCallInvite(TeamId),
    /// Lightweight room presence channel used for membership counting.
    RoomPresence(RoomId),
}

impl ChannelKind {
    /// Parses a channel string into a typed channel.
    pub fn parse(channel: &str) -> Option<Self> {
        let parts: Vec<&str> = channel.splitn(2, ':').collect();
        match parts.as_slice() {
            ["calls", id] => id.parse().ok().map(ChannelKind::Personal),
            ["call-invite", id] => id.parse().ok().map(ChannelKind::CallInvite),
            ["team-call-invite", id] => id.parse().ok().map(ChannelKind::TeamCallInvite),
            ["room-presence", id] => id.parse().ok().map(ChannelKind::RoomPresence),
            _ => None,
        }
    }

    /// Converts to the wire channel name.
    pub fn to_channel_name(&self) -> ChannelName {
        let raw = match self {
            ChannelKind::Personal(id) => format!("calls:{id}"),
            ChannelKind::CallInvite(id) => format!("call-invite:{id}"),
            ChannelKind::TeamCallInvite(id) => format!("team-call-invite:{id}"),
            ChannelKind::RoomPresence(id) => format!("room-presence:{id}"),
        };
        ChannelName(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let kinds = [
            ChannelKind::Personal(UserId::new()),
            ChannelKind::CallInvite(ConversationId::new()),
            ChannelKind::TeamCallInvite(TeamId::new()),
            ChannelKind::RoomPresence(RoomId::new()),
        ];
        for kind in kinds {
            let name = kind.to_channel_name();
            assert_eq!(ChannelKind::parse(name.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(ChannelKind::parse("presence:global"), None);
        assert_eq!(ChannelKind::parse("calls:not-a-uuid"), None);
        assert_eq!(ChannelKind::parse("garbage"), None);
    }
}
