//! In-memory pub/sub for single-process runs and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, watch};
use tracing::trace;

use huddle_core::events::Envelope;
use huddle_core::traits::PubSubTransport;
use huddle_core::types::ChannelName;
use huddle_core::{ClientError, ClientResult};

/// Per-channel state: the broadcast queue plus a membership counter.
#[derive(Debug)]
struct ChannelState {
    tx: broadcast::Sender<Envelope>,
    members: watch::Sender<usize>,
}

impl ChannelState {
    fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        let (members, _) = watch::channel(0);
        Self { tx, members }
    }
}

/// In-memory pub/sub transport.
///
/// Every publish goes through a serde_json round trip so consumers
/// exercise the real wire shape rather than in-process shortcuts.
#[derive(Debug)]
pub struct MemoryPubSub {
    /// Channel name → channel state.
    channels: DashMap<String, ChannelState>,
    /// Buffer size for per-channel broadcast queues.
    buffer_size: usize,
}

impl MemoryPubSub {
    /// Create a new in-memory pub/sub.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: DashMap::new(),
            buffer_size,
        }
    }

    fn state<'a>(
        &'a self,
        channel: &ChannelName,
    ) -> dashmap::mapref::one::RefMut<'a, String, ChannelState> {
        self.channels
            .entry(channel.as_str().to_string())
            .or_insert_with(|| ChannelState::new(self.buffer_size))
    }

    /// Number of live channels, for diagnostics.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait]
impl PubSubTransport for MemoryPubSub {
    async fn join(&self, channel: &ChannelName) -> ClientResult<()> {
        let state = self.state(channel);
        state.members.send_modify(|count| *count += 1);
        trace!(channel = %channel, members = *state.members.borrow(), "channel joined");
        Ok(())
    }

    async fn leave(&self, channel: &ChannelName) -> ClientResult<()> {
        if let Some(state) = self.channels.get(channel.as_str()) {
            state.members.send_modify(|count| *count = count.saturating_sub(1));
            trace!(channel = %channel, members = *state.members.borrow(), "channel left");
        }
        Ok(())
    }

    async fn publish(&self, channel: &ChannelName, envelope: Envelope) -> ClientResult<()> {
        // Wire round trip: serialize and parse back before delivery.
        let raw = serde_json::to_string(&envelope)?;
        let delivered: Envelope = serde_json::from_str(&raw)?;

        let state = self.state(channel);
        // No receivers is not an error for a fire-and-forget send.
        let _ = state.tx.send(delivered);
        Ok(())
    }

    async fn subscribe(&self, channel: &ChannelName) -> ClientResult<broadcast::Receiver<Envelope>> {
        let state = self.channels.get(channel.as_str()).ok_or_else(|| {
            ClientError::channel_join(format!("channel '{channel}' has not been joined"))
        })?;
        Ok(state.tx.subscribe())
    }

    async fn member_count(&self, channel: &ChannelName) -> ClientResult<watch::Receiver<usize>> {
        let state = self.state(channel);
        Ok(state.members.subscribe())
    }
}
