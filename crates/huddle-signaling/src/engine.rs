//! Top-level signaling engine that ties the call subsystems together.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use huddle_core::config::{SignalingConfig, TransportConfig};
use huddle_core::events::CallInvitation;
use huddle_core::traits::{ProfileLookup, PubSubTransport, PushDispatcher};
use huddle_core::types::{CallTarget, ChannelKind, RoomId, UserId};
use huddle_core::ClientResult;

use crate::inbox::InvitationInbox;
use crate::mode::{TransportMode, TransportModeSelector};
use crate::ringer::OutboundRinger;
use crate::session::{CallSessionState, SessionMap};

/// Central signaling object for one signed-in client.
///
/// Owns the outbound ringer, the invitation inbox, and the transport
/// mode selector, and exposes the surface the UI layer consumes.
#[derive(Clone)]
pub struct SignalingEngine {
    local_user: UserId,
    transport: Arc<dyn PubSubTransport>,
    profiles: Arc<dyn ProfileLookup>,
    push: Arc<dyn PushDispatcher>,
    ringer: Arc<OutboundRinger>,
    inbox: Arc<InvitationInbox>,
    mode: Arc<TransportModeSelector>,
    sessions: Arc<SessionMap>,
}

impl std::fmt::Debug for SignalingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingEngine")
            .field("local_user", &self.local_user)
            .finish()
    }
}

impl SignalingEngine {
    /// Create an engine for the local user.
    pub fn new(
        local_user: UserId,
        transport: Arc<dyn PubSubTransport>,
        profiles: Arc<dyn ProfileLookup>,
        push: Arc<dyn PushDispatcher>,
        signaling: SignalingConfig,
        transport_config: TransportConfig,
    ) -> Self {
        let sessions = Arc::new(SessionMap::new());
        let ringer = Arc::new(OutboundRinger::new(
            local_user,
            Arc::clone(&transport),
            signaling.clone(),
            transport_config.join_warmup(),
        ));
        let inbox = Arc::new(InvitationInbox::new(
            local_user,
            Arc::clone(&transport),
            signaling.clone(),
            Arc::clone(&sessions),
        ));
        let mode = Arc::new(TransportModeSelector::new(
            Arc::clone(&transport),
            signaling,
        ));

        info!(%local_user, "signaling engine initialized");

        Self {
            local_user,
            transport,
            profiles,
            push,
            ringer,
            inbox,
            mode,
            sessions,
        }
    }

    /// The local user this engine signals for.
    pub fn local_user(&self) -> UserId {
        self.local_user
    }

    /// Join and listen on a target's invitation channel.
    ///
    /// Clients call this on sign-in for their personal channel and for
    /// every conversation and team they belong to, so every recipient is
    /// subscribed before any ringing begins.
    pub async fn watch_target(&self, target: CallTarget) -> ClientResult<()> {
        let channel = target.invite_channel();
        self.transport.join(&channel).await?;
        let events = self.transport.subscribe(&channel).await?;
        self.inbox.attach(channel, events);
        Ok(())
    }

    /// Convenience: watch the local user's own personal channel.
    pub async fn watch_personal_channel(&self) -> ClientResult<()> {
        self.watch_target(CallTarget::User(self.local_user)).await
    }

    /// Ring a target.
    ///
    /// Resolves the caller profile, fires the push side channel once
    /// (best-effort), and starts the bounded resend loop. The only error
    /// surfaced is a channel that cannot be joined at all.
    pub async fn send_invitation(
        &self,
        target: CallTarget,
        target_display_name: &str,
        is_video: bool,
    ) -> ClientResult<()> {
        let profile = match self.profiles.profile(self.local_user).await {
            Ok(p) => p,
            Err(e) => {
                // A missing profile must not block the call.
                warn!(error = %e, "caller profile lookup failed, ringing with a bare id");
                huddle_core::traits::profile::UserProfile {
                    display_name: self.local_user.to_string(),
                    avatar_url: None,
                }
            }
        };

        let invitation = CallInvitation {
            caller_id: self.local_user,
            caller_display_name: profile.display_name,
            caller_avatar: profile.avatar_url,
            target,
            target_display_name: target_display_name.to_string(),
            is_video,
            issued_at: CallInvitation::now_ms(),
        };

        // Fire-and-forget push so background clients get alerted too.
        let push = Arc::clone(&self.push);
        let push_invitation = invitation.clone();
        tokio::spawn(async move {
            if let Err(e) = push.notify_ring(&push_invitation).await {
                debug!(error = %e, "push dispatch failed, ignoring");
            }
        });

        self.sessions.set(target, CallSessionState::RingingOutbound);
        self.ringer.ring(invitation).await
    }

    /// Reactive handle on the single pending incoming invitation.
    pub fn incoming_invitation(&self) -> watch::Receiver<Option<CallInvitation>> {
        self.inbox.incoming()
    }

    /// Accept the pending invitation, if any. Returns it so the
    /// call-media layer can construct its transport.
    pub async fn accept_call(&self) -> ClientResult<Option<CallInvitation>> {
        self.inbox.accept_call().await
    }

    /// Decline the pending invitation without notifying the sender.
    pub fn decline_call(&self) {
        self.inbox.decline_call();
    }

    /// End the call with a target: stops any resend loop, notifies all
    /// recipients, and clears local call state. Idempotent.
    pub async fn end_call(&self, target: CallTarget) -> ClientResult<()> {
        self.inbox.on_call_ended(target);
        self.ringer.end_call(target).await
    }

    /// Decide (or recall) the transport topology for a room.
    pub async fn select_transport_mode(&self, room_id: RoomId) -> ClientResult<TransportMode> {
        self.mode.select_mode(room_id).await
    }

    /// Externally force a room's transport mode.
    pub fn force_transport_mode(&self, room_id: RoomId, mode: TransportMode) {
        self.mode.force_mode(room_id, mode);
    }

    /// Degraded-experience flag for a mesh room over the limit.
    pub fn degraded(&self, room_id: RoomId) -> Option<watch::Receiver<bool>> {
        self.mode.degraded(room_id)
    }

    /// Whether a ring is currently in progress for a target.
    pub fn is_ringing(&self, target: &CallTarget) -> bool {
        self.ringer.is_ringing(target)
    }

    /// Call session state for a target.
    pub fn session_state(&self, target: &CallTarget) -> CallSessionState {
        self.sessions.state(target)
    }

    /// Leave a room's presence channel when the media layer disconnects.
    pub async fn leave_room(&self, room_id: RoomId) -> ClientResult<()> {
        let channel = ChannelKind::RoomPresence(room_id).to_channel_name();
        self.transport.leave(&channel).await
    }

    /// Periodic de-dup maintenance; callers may hook this to a slow
    /// timer if long sessions accumulate many targets.
    pub fn cleanup(&self) {
        self.inbox.cleanup();
    }

    /// Tear down every background task: active rings, inbox listeners,
    /// and degradation monitors.
    pub fn shutdown(&self) {
        self.ringer.stop();
        self.inbox.stop();
        self.mode.stop();
        info!(local_user = %self.local_user, "signaling engine shut down");
    }
}
