//! Presence store trait: the single presence row per user.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::result::ClientResult;
use crate::types::{PresenceRecord, UserId};

/// Backend table holding one presence row per user, with a change feed.
///
/// Writes are last-write-wins upserts; no transactional semantics. Only
/// the owning client writes its own row.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Upsert the caller's presence row.
    async fn upsert(&self, record: PresenceRecord) -> ClientResult<()>;

    /// Best-effort final write marking the user offline, usable during
    /// teardown. Implementations must not block on confirmation.
    fn mark_offline(&self, user_id: UserId);

    /// Subscribe to the change feed of all presence rows.
    fn changes(&self) -> broadcast::Receiver<PresenceRecord>;

    /// Fetch the current state of every row, for roster warm start.
    async fn snapshot(&self) -> ClientResult<Vec<PresenceRecord>>;
}
