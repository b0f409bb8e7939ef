//! Invitation inbox: the receiving side of the call invitation protocol.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use huddle_core::config::SignalingConfig;
use huddle_core::events::{CallInvitation, Envelope, SignalEvent};
use huddle_core::traits::PubSubTransport;
use huddle_core::types::{CallTarget, ChannelName, UserId};
use huddle_core::ClientResult;

use crate::dedup::AcceptedCallSet;
use crate::session::{CallSessionState, SessionMap};

/// Evaluates incoming invitations from every attached channel and holds
/// the single visible pending invitation.
///
/// Invitations are evaluated independently per channel subscription, but
/// the pending slot is global: first-seen-from-a-caller wins until
/// resolved, and a different caller never silently replaces it.
pub struct InvitationInbox {
    local_user: UserId,
    config: SignalingConfig,
    transport: Arc<dyn PubSubTransport>,
    accepted: AcceptedCallSet,
    sessions: Arc<SessionMap>,
    pending: watch::Sender<Option<CallInvitation>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for InvitationInbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvitationInbox")
            .field("local_user", &self.local_user)
            .finish()
    }
}

impl InvitationInbox {
    /// Create an inbox for the local user.
    pub fn new(
        local_user: UserId,
        transport: Arc<dyn PubSubTransport>,
        config: SignalingConfig,
        sessions: Arc<SessionMap>,
    ) -> Self {
        let accepted = AcceptedCallSet::new(
            config.accept_dedup_ttl(),
            std::time::Duration::from_secs(config.invite_max_age_seconds),
        );
        let (pending, _) = watch::channel(None);
        Self {
            local_user,
            config,
            transport,
            accepted,
            sessions,
            pending,
            cancel: CancellationToken::new(),
        }
    }

    /// Reactive handle on the pending invitation slot.
    pub fn incoming(&self) -> watch::Receiver<Option<CallInvitation>> {
        self.pending.subscribe()
    }

    /// Attach a subscribed channel's event stream; spawns a consumer
    /// that feeds the inbox until shutdown.
    pub fn attach(
        self: &Arc<Self>,
        channel: ChannelName,
        mut events: broadcast::Receiver<Envelope>,
    ) {
        let inbox = Arc::clone(self);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(envelope) if envelope.is_compatible() => {
                            inbox.handle_event(envelope.event);
                        }
                        Ok(_) => trace!(%channel, "dropping envelope from a future wire version"),
                        Err(RecvError::Lagged(missed)) => {
                            trace!(%channel, missed, "inbox listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!(%channel, "inbox listener stopped");
        });
    }

    /// Accept the pending invitation, if any.
    ///
    /// Adds the target to the de-dup set, publishes `accepted` (the only
    /// signal the sender's resend loop listens for), clears the pending
    /// slot, and returns the invitation for the call-media layer.
    pub async fn accept_call(&self) -> ClientResult<Option<CallInvitation>> {
        let invitation = match self.take_pending() {
            Some(inv) => inv,
            None => return Ok(None),
        };

        let target = invitation.target;
        self.accepted.insert_accepted(target);
        self.sessions.set(target, CallSessionState::Accepted);

        let channel = target.invite_channel();
        let envelope = Envelope::new(SignalEvent::Accepted {
            target,
            user_id: self.local_user,
        });
        self.transport.publish(&channel, envelope).await?;

        Ok(Some(invitation))
    }

    /// Decline the pending invitation without notifying the sender; its
    /// own resend exhaustion handles the silence.
    pub fn decline_call(&self) {
        if let Some(invitation) = self.take_pending() {
            self.sessions.set(invitation.target, CallSessionState::Idle);
            debug!(target = %invitation.target, "invitation declined locally");
        }
    }

    /// Local bookkeeping when this client ends a call itself: clear any
    /// pending ring and tombstone the target so late resends stay quiet.
    pub fn on_call_ended(&self, target: CallTarget) {
        self.handle_event(SignalEvent::Ended {
            target,
            user_id: self.local_user,
        });
    }

    /// Stop all attached channel listeners.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Drop expired de-dup entries.
    pub fn cleanup(&self) {
        self.accepted.cleanup();
    }

    pub(crate) fn handle_event(&self, event: SignalEvent) {
        match event {
            SignalEvent::Invitation(invitation) => self.on_invitation(invitation),
            SignalEvent::Accepted { .. } => {
                // Another member answering does not clear our ring; the
                // call stays joinable until `ended`.
            }
            SignalEvent::Ended { target, .. } => self.on_ended(target),
        }
    }

    fn on_invitation(&self, invitation: CallInvitation) {
        if invitation.caller_id == self.local_user {
            trace!(target = %invitation.target, "ignoring own invitation");
            return;
        }

        let age = invitation.age_ms(CallInvitation::now_ms());
        if age > self.config.invite_max_age_ms() {
            debug!(target = %invitation.target, age_ms = age, "dropping stale invitation");
            return;
        }

        if self.accepted.suppresses(&invitation.target, invitation.issued_at) {
            debug!(target = %invitation.target, "dropping duplicate of an accepted or ended call");
            return;
        }

        self.pending.send_if_modified(|pending| match pending {
            None => {
                self.sessions
                    .set(invitation.target, CallSessionState::RingingInbound);
                debug!(
                    target = %invitation.target,
                    caller = %invitation.caller_id,
                    "invitation pending"
                );
                *pending = Some(invitation);
                true
            }
            Some(current) if current.caller_id == invitation.caller_id => {
                // Same caller may refresh the pending invitation (a
                // resend, or a retargeted ring).
                self.sessions
                    .set(invitation.target, CallSessionState::RingingInbound);
                *pending = Some(invitation);
                true
            }
            Some(current) => {
                debug!(
                    pending_caller = %current.caller_id,
                    new_caller = %invitation.caller_id,
                    "keeping existing pending invitation from a different caller"
                );
                false
            }
        });
    }

    fn on_ended(&self, target: CallTarget) {
        self.accepted.mark_ended(target, CallInvitation::now_ms());
        self.sessions.set(target, CallSessionState::Idle);

        self.pending.send_if_modified(|pending| {
            match pending {
                Some(current) if current.target == target => {
                    *pending = None;
                    true
                }
                _ => false,
            }
        });
    }

    fn take_pending(&self) -> Option<CallInvitation> {
        let mut taken = None;
        self.pending.send_if_modified(|pending| {
            taken = pending.take();
            taken.is_some()
        });
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use huddle_transport::MemoryPubSub;

    fn invitation(caller: UserId, target: CallTarget, issued_at: i64) -> CallInvitation {
        CallInvitation {
            caller_id: caller,
            caller_display_name: "caller".to_string(),
            caller_avatar: None,
            target,
            target_display_name: "target".to_string(),
            is_video: false,
            issued_at,
        }
    }

    fn inbox(local: UserId) -> InvitationInbox {
        InvitationInbox::new(
            local,
            Arc::new(MemoryPubSub::new(16)),
            SignalingConfig::default(),
            Arc::new(SessionMap::new()),
        )
    }

    #[tokio::test]
    async fn test_self_invitation_is_ignored() {
        let local = UserId::new();
        let inbox = inbox(local);

        let inv = invitation(local, CallTarget::User(UserId::new()), CallInvitation::now_ms());
        inbox.handle_event(SignalEvent::Invitation(inv));

        assert!(inbox.incoming().borrow().is_none());
    }

    #[tokio::test]
    async fn test_stale_invitation_is_dropped() {
        let inbox = inbox(UserId::new());

        let stale = CallInvitation::now_ms() - 46_000;
        let inv = invitation(UserId::new(), CallTarget::User(UserId::new()), stale);
        inbox.handle_event(SignalEvent::Invitation(inv));

        assert!(inbox.incoming().borrow().is_none());
    }

    #[tokio::test]
    async fn test_different_caller_does_not_replace_pending() {
        let inbox = inbox(UserId::new());
        let caller_a = UserId::new();
        let caller_b = UserId::new();
        let t1 = CallTarget::User(UserId::new());
        let t2 = CallTarget::User(UserId::new());

        inbox.handle_event(SignalEvent::Invitation(invitation(
            caller_a,
            t1,
            CallInvitation::now_ms(),
        )));
        inbox.handle_event(SignalEvent::Invitation(invitation(
            caller_b,
            t2,
            CallInvitation::now_ms(),
        )));

        let pending = inbox.incoming().borrow().clone().unwrap();
        assert_eq!(pending.caller_id, caller_a);
        assert_eq!(pending.target, t1);
    }

    #[tokio::test]
    async fn test_same_caller_refreshes_pending() {
        let inbox = inbox(UserId::new());
        let caller = UserId::new();
        let target = CallTarget::User(UserId::new());

        let first = CallInvitation::now_ms();
        inbox.handle_event(SignalEvent::Invitation(invitation(caller, target, first)));
        inbox.handle_event(SignalEvent::Invitation(invitation(
            caller,
            target,
            first + 500,
        )));

        let pending = inbox.incoming().borrow().clone().unwrap();
        assert_eq!(pending.caller_id, caller);
        assert_eq!(pending.issued_at, first + 500);
    }

    #[tokio::test]
    async fn test_ended_clears_pending_and_suppresses_late_resend() {
        let inbox = inbox(UserId::new());
        let caller = UserId::new();
        let target = CallTarget::User(UserId::new());
        let issued = CallInvitation::now_ms();

        inbox.handle_event(SignalEvent::Invitation(invitation(caller, target, issued)));
        assert!(inbox.incoming().borrow().is_some());

        inbox.handle_event(SignalEvent::Ended {
            target,
            user_id: caller,
        });
        assert!(inbox.incoming().borrow().is_none());

        // A late resend of the ended call stays suppressed.
        inbox.handle_event(SignalEvent::Invitation(invitation(caller, target, issued)));
        assert!(inbox.incoming().borrow().is_none());
    }

    #[tokio::test]
    async fn test_ended_before_invitation_still_suppresses() {
        let inbox = inbox(UserId::new());
        let caller = UserId::new();
        let target = CallTarget::User(UserId::new());
        let issued = CallInvitation::now_ms();

        // Out-of-order arrival: ended first, then the invitation.
        inbox.handle_event(SignalEvent::Ended {
            target,
            user_id: caller,
        });
        inbox.handle_event(SignalEvent::Invitation(invitation(caller, target, issued)));

        assert!(inbox.incoming().borrow().is_none());
    }

    #[tokio::test]
    async fn test_accept_publishes_and_dedups() {
        let local = UserId::new();
        let transport = Arc::new(MemoryPubSub::new(16));
        let sessions = Arc::new(SessionMap::new());
        let inbox = InvitationInbox::new(
            local,
            Arc::clone(&transport) as Arc<dyn PubSubTransport>,
            SignalingConfig::default(),
            Arc::clone(&sessions),
        );

        let caller = UserId::new();
        let target = CallTarget::User(local);
        let channel = target.invite_channel();
        transport.join(&channel).await.unwrap();
        let mut rx = transport.subscribe(&channel).await.unwrap();

        let issued = CallInvitation::now_ms();
        inbox.handle_event(SignalEvent::Invitation(invitation(caller, target, issued)));

        let accepted = inbox.accept_call().await.unwrap().unwrap();
        assert_eq!(accepted.caller_id, caller);
        assert!(inbox.incoming().borrow().is_none());
        assert_eq!(sessions.state(&target), CallSessionState::Accepted);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(
            envelope.event,
            SignalEvent::Accepted {
                target,
                user_id: local
            }
        );

        // Duplicate invitation within the de-dup window is dropped.
        inbox.handle_event(SignalEvent::Invitation(invitation(caller, target, issued)));
        assert!(inbox.incoming().borrow().is_none());
    }

    #[tokio::test]
    async fn test_decline_is_silent() {
        let local = UserId::new();
        let transport = Arc::new(MemoryPubSub::new(16));
        let inbox = InvitationInbox::new(
            local,
            Arc::clone(&transport) as Arc<dyn PubSubTransport>,
            SignalingConfig::default(),
            Arc::new(SessionMap::new()),
        );

        let target = CallTarget::User(local);
        let channel = target.invite_channel();
        transport.join(&channel).await.unwrap();
        let mut rx = transport.subscribe(&channel).await.unwrap();

        inbox.handle_event(SignalEvent::Invitation(invitation(
            UserId::new(),
            target,
            CallInvitation::now_ms(),
        )));
        inbox.decline_call();

        assert!(inbox.incoming().borrow().is_none());
        // Nothing was published.
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));

        // A declined target may ring again.
        inbox.handle_event(SignalEvent::Invitation(invitation(
            UserId::new(),
            target,
            CallInvitation::now_ms(),
        )));
        assert!(inbox.incoming().borrow().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dedup_window_expires_after_ttl() {
        let local = UserId::new();
        let transport = Arc::new(MemoryPubSub::new(16));
        let inbox = InvitationInbox::new(
            local,
            Arc::clone(&transport) as Arc<dyn PubSubTransport>,
            SignalingConfig::default(),
            Arc::new(SessionMap::new()),
        );

        let caller = UserId::new();
        let target = CallTarget::User(local);
        transport.join(&target.invite_channel()).await.unwrap();

        inbox.handle_event(SignalEvent::Invitation(invitation(
            caller,
            target,
            CallInvitation::now_ms(),
        )));
        inbox.accept_call().await.unwrap();

        tokio::time::advance(std::time::Duration::from_secs(121)).await;

        // Past the window, a fresh invitation is processed normally.
        inbox.handle_event(SignalEvent::Invitation(invitation(
            caller,
            target,
            CallInvitation::now_ms(),
        )));
        assert!(inbox.incoming().borrow().is_some());
    }
}
