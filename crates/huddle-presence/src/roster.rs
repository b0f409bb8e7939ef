//! Presence roster: last known record per user, with staleness inference.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use huddle_core::config::PresenceConfig;
use huddle_core::traits::PresenceStore;
use huddle_core::types::{PresenceRecord, PresenceStatus, UserId};

/// Read-side view of everyone's presence.
///
/// Consumes the store's change feed and answers effective-status queries
/// locally; no query ever touches the network. Feed lag or loss degrades
/// to last-known-state, never an error.
#[derive(Debug)]
pub struct PresenceRoster {
    records: DashMap<UserId, PresenceRecord>,
    config: PresenceConfig,
    cancel: CancellationToken,
}

impl PresenceRoster {
    /// Create an empty roster.
    pub fn new(config: PresenceConfig) -> Self {
        Self {
            records: DashMap::new(),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Warm-start from a snapshot and begin consuming the change feed.
    pub async fn start(self: &Arc<Self>, store: Arc<dyn PresenceStore>) {
        match store.snapshot().await {
            Ok(rows) => {
                for row in rows {
                    self.records.insert(row.user_id, row);
                }
            }
            Err(e) => {
                // Degrade to change-feed-only; do not fail the caller.
                warn!(error = %e, "presence snapshot failed, starting empty");
            }
        }

        let roster = Arc::clone(self);
        let cancel = self.cancel.clone();
        let mut feed = store.changes();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    change = feed.recv() => match change {
                        Ok(record) => {
                            roster.records.insert(record.user_id, record);
                        }
                        Err(RecvError::Lagged(missed)) => {
                            debug!(missed, "presence feed lagged, continuing with last known state");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("presence roster feed stopped");
        });
    }

    /// Stop consuming the change feed.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Effective status of a user: `Offline` when unknown or when the
    /// last heartbeat is older than the staleness window.
    pub fn effective_status(&self, user_id: UserId) -> PresenceStatus {
        self.records
            .get(&user_id)
            .map(|r| r.effective_status(Utc::now(), self.config.stale_window()))
            .unwrap_or(PresenceStatus::Offline)
    }

    /// The raw last known record, if any.
    pub fn record(&self, user_id: UserId) -> Option<PresenceRecord> {
        self.records.get(&user_id).map(|r| r.value().clone())
    }

    /// All users currently readable as something other than offline.
    pub fn reachable_users(&self) -> Vec<UserId> {
        let now = Utc::now();
        let window = self.config.stale_window();
        self.records
            .iter()
            .filter(|r| r.effective_status(now, window) != PresenceStatus::Offline)
            .map(|r| r.user_id)
            .collect()
    }
}
