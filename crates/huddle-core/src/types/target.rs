//! Call target: the addressable recipient of a ring.

use serde::{Deserialize, Serialize};

use super::channel::{ChannelKind, ChannelName};
use super::id::{ConversationId, TeamId, UserId};

/// The logical target of a call: a single user, a group conversation,
/// or a whole team.
///
/// Every target maps to exactly one invitation channel; ringing a target
/// means publishing on that channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CallTarget {
    /// A direct call to one user.
    User(UserId),
    /// A call ringing every member of a conversation.
    Conversation(ConversationId),
    /// A call ringing every member of a team.
    Team(TeamId),
}

impl CallTarget {
    /// The invitation channel for this target.
    pub fn invite_channel(&self) -> ChannelName {
        match self {
            Self::User(id) => ChannelKind::Personal(*id).to_channel_name(),
            Self::Conversation(id) => ChannelKind::CallInvite(*id).to_channel_name(),
            Self::Team(id) => ChannelKind::TeamCallInvite(*id).to_channel_name(),
        }
    }
}

impl std::fmt::Display for CallTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Conversation(id) => write!(f, "conversation:{id}"),
            Self::Team(id) => write!(f, "team:{id}"),
        }
    }
}
