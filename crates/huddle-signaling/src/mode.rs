//! Transport mode selector: one-shot mesh vs. relay decision per room.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use huddle_core::config::SignalingConfig;
use huddle_core::traits::PubSubTransport;
use huddle_core::types::{ChannelKind, RoomId};
use huddle_core::ClientResult;

/// The call-transport topology for a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Direct peer-to-peer connections among all participants.
    Mesh,
    /// All participants connect to a central media relay.
    Relay,
}

/// Decides the transport topology once per room and never revisits it.
///
/// The decision is made under incomplete information: whatever the first
/// membership sync reports wins, and a missing sync defaults to mesh
/// rather than blocking the call. Participants joining past the mesh
/// limit later only raise a degraded-experience flag.
pub struct TransportModeSelector {
    transport: Arc<dyn PubSubTransport>,
    config: SignalingConfig,
    decisions: DashMap<RoomId, TransportMode>,
    degraded: DashMap<RoomId, watch::Receiver<bool>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for TransportModeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportModeSelector")
            .field("decisions", &self.decisions.len())
            .finish()
    }
}

impl TransportModeSelector {
    /// Create a selector over the given transport.
    pub fn new(transport: Arc<dyn PubSubTransport>, config: SignalingConfig) -> Self {
        Self {
            transport,
            config,
            decisions: DashMap::new(),
            degraded: DashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Externally force a room's mode before any decision is made. Used
    /// when the call kind dictates the topology up front.
    pub fn force_mode(&self, room_id: RoomId, mode: TransportMode) {
        self.decisions.entry(room_id).or_insert(mode);
    }

    /// The sticky decision for a room, if one was made.
    pub fn decided(&self, room_id: RoomId) -> Option<TransportMode> {
        self.decisions.get(&room_id).map(|m| *m.value())
    }

    /// Degraded-experience flag for a mesh room whose membership later
    /// crossed the limit.
    pub fn degraded(&self, room_id: RoomId) -> Option<watch::Receiver<bool>> {
        self.degraded.get(&room_id).map(|rx| rx.value().clone())
    }

    /// Decide the transport mode for a room.
    ///
    /// Joins the room presence channel and waits for the first
    /// membership sync: a count above the mesh limit selects relay,
    /// anything else mesh. No sync within the decision timeout defaults
    /// to mesh. The decision is immutable for the session; repeated
    /// calls return the stored value without touching the channel again.
    pub async fn select_mode(&self, room_id: RoomId) -> ClientResult<TransportMode> {
        if let Some(mode) = self.decided(room_id) {
            return Ok(mode);
        }

        let channel = ChannelKind::RoomPresence(room_id).to_channel_name();
        // Grab the membership feed first so our own join is the first
        // sync event we can observe.
        let mut counts = self.transport.member_count(&channel).await?;
        self.transport.join(&channel).await?;

        let limit = self.config.mesh_participant_limit;
        let mode = match time::timeout(self.config.decision_timeout(), counts.changed()).await {
            Ok(Ok(())) => {
                let count = *counts.borrow_and_update();
                if count > limit {
                    TransportMode::Relay
                } else {
                    TransportMode::Mesh
                }
            }
            _ => {
                debug!(%room_id, "no membership sync before timeout, defaulting to mesh");
                TransportMode::Mesh
            }
        };

        // First writer wins; a concurrent call may have decided already.
        let decided = *self.decisions.entry(room_id).or_insert(mode);
        debug!(%room_id, ?decided, "transport mode selected");

        if decided == TransportMode::Mesh {
            self.watch_for_degradation(room_id, counts);
        }

        Ok(decided)
    }

    /// Stop all degradation monitors.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    fn watch_for_degradation(&self, room_id: RoomId, mut counts: watch::Receiver<usize>) {
        let (tx, rx) = watch::channel(false);
        self.degraded.insert(room_id, rx);

        let limit = self.config.mesh_participant_limit;
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = counts.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let count = *counts.borrow_and_update();
                        if count > limit && !*tx.borrow() {
                            // Mode switching mid-call is unsupported; the
                            // room stays mesh and the UI shows a warning.
                            warn!(%room_id, count, limit, "mesh room over participant limit, experience degraded");
                            let _ = tx.send(true);
                        }
                    }
                }
            }
        });
    }
}
