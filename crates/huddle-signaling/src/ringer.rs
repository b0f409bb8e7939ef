//! Outbound ringer: retry-until-cancelled invitation publishing.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use huddle_core::config::SignalingConfig;
use huddle_core::events::{CallInvitation, Envelope, SignalEvent};
use huddle_core::traits::PubSubTransport;
use huddle_core::types::{CallTarget, UserId};
use huddle_core::{ClientError, ClientResult};

/// Rings targets and manages the resend loop per target.
///
/// The sender never learns about declines; a ring stops on `accepted`,
/// on resend exhaustion, or on a manual end. Each active ring owns one
/// [`CancellationToken`] so teardown can clear every timer
/// unconditionally.
pub struct OutboundRinger {
    local_user: UserId,
    transport: Arc<dyn PubSubTransport>,
    config: SignalingConfig,
    join_warmup: Duration,
    active: DashMap<CallTarget, CancellationToken>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for OutboundRinger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundRinger")
            .field("local_user", &self.local_user)
            .field("active", &self.active.len())
            .finish()
    }
}

impl OutboundRinger {
    /// Create a ringer for the local user.
    pub fn new(
        local_user: UserId,
        transport: Arc<dyn PubSubTransport>,
        config: SignalingConfig,
        join_warmup: Duration,
    ) -> Self {
        Self {
            local_user,
            transport,
            config,
            join_warmup,
            active: DashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Whether a ring is currently active for the target.
    pub fn is_ringing(&self, target: &CallTarget) -> bool {
        self.active.contains_key(target)
    }

    /// Ring the invitation's target.
    ///
    /// Joins the target channel (the only failure surfaced to the
    /// caller), waits the subscribe warm-up, publishes immediately, then
    /// re-publishes every resend interval until accepted, ended, or the
    /// attempt budget is spent. Re-ringing an already-ringing target is
    /// a no-op.
    pub async fn ring(self: &Arc<Self>, invitation: CallInvitation) -> ClientResult<()> {
        let target = invitation.target;
        let cancel = self.shutdown.child_token();

        // Reserve the slot before the first await so overlapping rings
        // for the same target cannot both pass the guard.
        match self.active.entry(target) {
            Entry::Occupied(_) => {
                debug!(%target, "already ringing, ignoring duplicate send");
                return Ok(());
            }
            Entry::Vacant(slot) => {
                slot.insert(cancel.clone());
            }
        }

        let channel = target.invite_channel();
        if let Err(e) = self.transport.join(&channel).await {
            self.active.remove(&target);
            return Err(ClientError::with_source(
                huddle_core::error::ErrorKind::ChannelJoin,
                format!("couldn't start the call: joining '{channel}' failed"),
                e,
            ));
        }
        let events = match self.transport.subscribe(&channel).await {
            Ok(events) => events,
            Err(e) => {
                self.active.remove(&target);
                return Err(e);
            }
        };

        // The accept listener shares the channel we ring on; give the
        // subscription a moment to establish before the first publish.
        time::sleep(self.join_warmup).await;

        let ringer = Arc::clone(self);
        tokio::spawn(async move {
            ringer.run_ring(invitation, events, cancel).await;
            ringer.active.remove(&target);
        });

        Ok(())
    }

    /// Cancel the resend loop for a target and notify all recipients the
    /// call is over. Idempotent.
    pub async fn end_call(&self, target: CallTarget) -> ClientResult<()> {
        if let Some((_, cancel)) = self.active.remove(&target) {
            cancel.cancel();
        }

        let channel = target.invite_channel();
        let envelope = Envelope::new(SignalEvent::Ended {
            target,
            user_id: self.local_user,
        });
        self.transport.publish(&channel, envelope).await
    }

    /// Cancel every active ring without publishing anything.
    pub fn stop(&self) {
        self.shutdown.cancel();
        self.active.clear();
    }

    async fn run_ring(
        &self,
        invitation: CallInvitation,
        mut events: tokio::sync::broadcast::Receiver<Envelope>,
        cancel: CancellationToken,
    ) {
        let target = invitation.target;
        let channel = target.invite_channel();
        let max_attempts = self.config.max_attempts;

        let mut interval = time::interval(self.config.resend_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut attempts: u32 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(%target, "ring cancelled");
                    break;
                }
                event = events.recv() => match event {
                    Ok(envelope) if envelope.is_compatible() => {
                        if let SignalEvent::Accepted { target: t, user_id } = envelope.event {
                            if t == target {
                                debug!(%target, %user_id, attempts, "ring accepted");
                                break;
                            }
                        }
                    }
                    Ok(_) => trace!(%target, "dropping envelope from a future wire version"),
                    Err(RecvError::Lagged(missed)) => {
                        trace!(%target, missed, "accept listener lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!(%target, "invite channel closed, stopping ring");
                        break;
                    }
                },
                _ = interval.tick() => {
                    if attempts >= max_attempts {
                        debug!(%target, attempts, "ring timed out with no response");
                        break;
                    }
                    attempts += 1;
                    let envelope = Envelope::new(SignalEvent::Invitation(invitation.clone()));
                    if let Err(e) = self.transport.publish(&channel, envelope).await {
                        // Non-fatal: the next tick retries.
                        warn!(%target, attempt = attempts, error = %e, "invitation publish failed");
                    }
                }
            }
        }
    }
}
