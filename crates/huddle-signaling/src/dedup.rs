//! Time-bounded suppression of duplicate and late invitations.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use huddle_core::types::CallTarget;

/// Why a target is currently suppressed.
#[derive(Debug, Clone, Copy)]
enum Entry {
    /// The local user accepted a call for this target; every invitation
    /// is suppressed until the entry expires.
    Accepted { expires: Instant },
    /// The call for this target ended. Only invitations issued before
    /// the end are suppressed (late resends of the finished call); a
    /// fresh call issued afterwards rings normally.
    Ended { ended_at_ms: i64, expires: Instant },
}

/// De-dup set over call targets.
///
/// Accepting a call inserts the target for the accept TTL (the window a
/// call may run before its channel naturally quiets down). An `ended`
/// event downgrades the entry to a tombstone keyed on the end timestamp,
/// so resends that raced the `ended` are still dropped while a new call
/// is not.
#[derive(Debug)]
pub struct AcceptedCallSet {
    accept_ttl: Duration,
    tombstone_ttl: Duration,
    entries: Mutex<HashMap<CallTarget, Entry>>,
}

impl AcceptedCallSet {
    /// Create a set with the given accept TTL and ended-tombstone TTL.
    pub fn new(accept_ttl: Duration, tombstone_ttl: Duration) -> Self {
        Self {
            accept_ttl,
            tombstone_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record that the local user accepted a call for `target`.
    pub fn insert_accepted(&self, target: CallTarget) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            target,
            Entry::Accepted {
                expires: Instant::now() + self.accept_ttl,
            },
        );
    }

    /// Record that the call for `target` ended at wall-clock `ended_at_ms`.
    /// Replaces any accept entry with an ended tombstone.
    pub fn mark_ended(&self, target: CallTarget, ended_at_ms: i64) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            target,
            Entry::Ended {
                ended_at_ms,
                expires: Instant::now() + self.tombstone_ttl,
            },
        );
    }

    /// Whether an invitation for `target` issued at `issued_at_ms`
    /// should be dropped.
    pub fn suppresses(&self, target: &CallTarget, issued_at_ms: i64) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        match entries.get(target) {
            Some(Entry::Accepted { expires }) if *expires > now => true,
            Some(Entry::Ended {
                ended_at_ms,
                expires,
            }) if *expires > now => issued_at_ms <= *ended_at_ms,
            Some(_) => {
                entries.remove(target);
                false
            }
            None => false,
        }
    }

    /// Drop expired entries.
    pub fn cleanup(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        entries.retain(|_, entry| match entry {
            Entry::Accepted { expires } | Entry::Ended { expires, .. } => *expires > now,
        });
    }

    /// Number of live entries, for diagnostics.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
