//! Liveness heartbeat: keeps the local user's presence row fresh.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use huddle_core::config::PresenceConfig;
use huddle_core::traits::PresenceStore;
use huddle_core::types::{PresenceRecord, UserId};

use crate::resolver::StatusResolver;

/// Publishes the local user's presence row every heartbeat interval and
/// force-publishes on status-changing actions.
///
/// Write failures are silent and non-fatal; the next tick self-heals.
/// All timers hang off one [`CancellationToken`] that `stop()` cancels
/// unconditionally, so no interval survives the service.
pub struct HeartbeatService {
    user_id: UserId,
    store: Arc<dyn PresenceStore>,
    config: PresenceConfig,
    resolver: Mutex<StatusResolver>,
    /// Guards against overlapping upserts: a slow write makes the next
    /// tick skip rather than queue.
    in_flight: AtomicBool,
    cancel: CancellationToken,
}

impl std::fmt::Debug for HeartbeatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatService")
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl HeartbeatService {
    /// Create a heartbeat service for the local user.
    pub fn new(user_id: UserId, store: Arc<dyn PresenceStore>, config: PresenceConfig) -> Self {
        let resolver = StatusResolver::new(config.idle_timeout());
        Self {
            user_id,
            store,
            config,
            resolver: Mutex::new(resolver),
            in_flight: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Start the heartbeat loop. The first publish happens immediately,
    /// creating the row on sign-in.
    pub fn start(self: &Arc<Self>) {
        let service = Arc::clone(self);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut interval = time::interval(service.config.heartbeat_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => service.publish_once().await,
                }
            }

            debug!(user_id = %service.user_id, "heartbeat loop stopped");
        });
    }

    /// Stop the heartbeat loop and issue one best-effort final write
    /// marking the user offline.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.store.mark_offline(self.user_id);
    }

    /// Set or clear manual DND and publish immediately so observers see
    /// the change without waiting for the next tick.
    pub async fn set_manual_dnd(&self, dnd: bool) {
        {
            let mut resolver = self.resolver.lock().unwrap_or_else(|e| e.into_inner());
            resolver.set_manual_dnd(dnd);
        }
        self.publish_once().await;
    }

    /// Set or clear the in-call flag with the same immediate-publish
    /// contract. No-op while manual DND is set.
    pub async fn set_in_call(&self, active: bool) {
        let applied = {
            let mut resolver = self.resolver.lock().unwrap_or_else(|e| e.into_inner());
            resolver.set_in_call(active)
        };
        if applied {
            self.publish_once().await;
        }
    }

    /// Set or clear the in-meeting flag. No-op while manual DND is set.
    pub async fn set_in_meeting(&self, active: bool) {
        let applied = {
            let mut resolver = self.resolver.lock().unwrap_or_else(|e| e.into_inner());
            resolver.set_in_meeting(active)
        };
        if applied {
            self.publish_once().await;
        }
    }

    /// Record an input activity signal. Flipping out of idle publishes
    /// immediately.
    pub async fn record_activity(&self) {
        let left_idle = {
            let mut resolver = self.resolver.lock().unwrap_or_else(|e| e.into_inner());
            resolver.record_activity()
        };
        if left_idle {
            self.publish_once().await;
        }
    }

    /// The status the next heartbeat would publish.
    pub fn current_record(&self) -> PresenceRecord {
        let resolver = self.resolver.lock().unwrap_or_else(|e| e.into_inner());
        PresenceRecord {
            user_id: self.user_id,
            status: resolver.resolve(),
            manual_override: resolver.manual_override(),
            last_seen_at: Utc::now(),
        }
    }

    async fn publish_once(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            trace!(user_id = %self.user_id, "upsert in flight, skipping tick");
            return;
        }
        if self.cancel.is_cancelled() {
            self.in_flight.store(false, Ordering::SeqCst);
            return;
        }

        let record = self.current_record();
        if let Err(e) = self.store.upsert(record).await {
            warn!(user_id = %self.user_id, error = %e, "heartbeat upsert failed, will retry next tick");
        }

        // A stop() that raced this write has already marked offline;
        // re-assert so the slow write does not resurrect the row.
        if self.cancel.is_cancelled() {
            self.store.mark_offline(self.user_id);
        }

        self.in_flight.store(false, Ordering::SeqCst);
    }
}
