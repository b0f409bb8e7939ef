//! Push notification dispatch trait.

use async_trait::async_trait;

use crate::events::CallInvitation;
use crate::result::ClientResult;

/// Best-effort side channel alerting background or closed clients about
/// an incoming ring. Callers fire once per ring and swallow failures.
#[async_trait]
pub trait PushDispatcher: Send + Sync {
    /// Dispatch a ring notification for the invitation's target.
    async fn notify_ring(&self, invitation: &CallInvitation) -> ClientResult<()>;
}

/// A dispatcher that drops every notification. Used where push delivery
/// is not wired up (tests, demo).
#[derive(Debug, Default)]
pub struct NoopPushDispatcher;

#[async_trait]
impl PushDispatcher for NoopPushDispatcher {
    async fn notify_ring(&self, _invitation: &CallInvitation) -> ClientResult<()> {
        Ok(())
    }
}
