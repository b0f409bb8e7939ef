//! Pub/sub transport trait.

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::events::Envelope;
use crate::result::ClientResult;
use crate::types::ChannelName;

/// A best-effort pub/sub transport over named logical channels.
///
/// No delivery guarantee and no ordering guarantee across channels.
/// Within a channel, delivery order is assumed to reflect send order,
/// but consumers must tolerate out-of-order arrival for the same target.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    /// Join a channel. Joining is the subscribe-establishment handshake:
    /// only sends issued after a join are guaranteed to be observable by
    /// the joining client, and senders should tolerate a short warm-up
    /// before the first publish they expect to see themselves.
    async fn join(&self, channel: &ChannelName) -> ClientResult<()>;

    /// Leave a channel, dropping its membership count by one.
    async fn leave(&self, channel: &ChannelName) -> ClientResult<()>;

    /// Fire-and-forget publish. Resolves once the transport accepts the
    /// send, not once any receiver has processed it.
    async fn publish(&self, channel: &ChannelName, envelope: Envelope) -> ClientResult<()>;

    /// Subscribe to a channel's event stream. The channel must have been
    /// joined first.
    async fn subscribe(&self, channel: &ChannelName) -> ClientResult<broadcast::Receiver<Envelope>>;

    /// Membership sync feed for a channel: the receiver yields the live
    /// member count as join/leave events arrive.
    async fn member_count(&self, channel: &ChannelName) -> ClientResult<watch::Receiver<usize>>;
}
