//! In-memory presence store for tests and the demo binary.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast;

use huddle_core::traits::PresenceStore;
use huddle_core::types::{ManualOverride, PresenceRecord, PresenceStatus, UserId};
use huddle_core::{ClientError, ClientResult};

/// In-memory presence table with a broadcast change feed.
///
/// Supports write-failure injection so heartbeat recovery paths can be
/// exercised without a backend.
#[derive(Debug)]
pub struct MemoryPresenceStore {
    rows: DashMap<UserId, PresenceRecord>,
    changes: broadcast::Sender<PresenceRecord>,
    fail_writes: AtomicBool,
    write_delay_ms: AtomicU64,
    write_count: AtomicU64,
}

impl MemoryPresenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            rows: DashMap::new(),
            changes,
            fail_writes: AtomicBool::new(false),
            write_delay_ms: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
        }
    }

    /// Toggle write-failure injection.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Inject a fixed latency into every upsert, simulating a slow
    /// backend write.
    pub fn delay_writes(&self, delay: std::time::Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of successful upserts so far.
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Read a row directly, bypassing the change feed.
    pub fn get(&self, user_id: UserId) -> Option<PresenceRecord> {
        self.rows.get(&user_id).map(|r| r.value().clone())
    }

    fn apply(&self, record: PresenceRecord) {
        self.rows.insert(record.user_id, record.clone());
        // No subscribers is fine; the feed is best-effort.
        let _ = self.changes.send(record);
    }
}

impl Default for MemoryPresenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn upsert(&self, record: PresenceRecord) -> ClientResult<()> {
        let delay_ms = self.write_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ClientError::transport("injected presence write failure"));
        }
        self.write_count.fetch_add(1, Ordering::SeqCst);
        self.apply(record);
        Ok(())
    }

    fn mark_offline(&self, user_id: UserId) {
        // Final fire-and-forget write; keeps the manual override so DND
        // survives a reconnect.
        let manual_override = self
            .rows
            .get(&user_id)
            .map(|r| r.manual_override)
            .unwrap_or(ManualOverride::None);

        self.apply(PresenceRecord {
            user_id,
            status: PresenceStatus::Offline,
            manual_override,
            last_seen_at: Utc::now(),
        });
    }

    fn changes(&self) -> broadcast::Receiver<PresenceRecord> {
        self.changes.subscribe()
    }

    async fn snapshot(&self) -> ClientResult<Vec<PresenceRecord>> {
        Ok(self.rows.iter().map(|r| r.value().clone()).collect())
    }
}
