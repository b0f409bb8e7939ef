//! Shared domain types: identifiers, channel names, call targets, presence.

pub mod channel;
pub mod id;
pub mod presence;
pub mod target;

pub use channel::{ChannelKind, ChannelName};
pub use id::{ConversationId, RoomId, TeamId, UserId};
pub use presence::{ManualOverride, PresenceRecord, PresenceStatus};
pub use target::CallTarget;
