//! End-to-end invitation protocol tests: two engines over the in-memory
//! transport, driven on virtual time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use huddle_core::config::{SignalingConfig, TransportConfig};
use huddle_core::events::SignalEvent;
use huddle_core::traits::{NoopPushDispatcher, ProfileLookup, PubSubTransport, UserProfile};
use huddle_core::types::{CallTarget, RoomId, UserId};
use huddle_core::ClientResult;
use huddle_signaling::{CallSessionState, SignalingEngine, TransportMode};
use huddle_transport::MemoryPubSub;

struct StaticProfiles;

#[async_trait]
impl ProfileLookup for StaticProfiles {
    async fn profile(&self, user_id: UserId) -> ClientResult<UserProfile> {
        Ok(UserProfile {
            display_name: format!("user-{user_id}"),
            avatar_url: None,
        })
    }
}

fn engine(user: UserId, transport: &Arc<MemoryPubSub>) -> SignalingEngine {
    SignalingEngine::new(
        user,
        Arc::clone(transport) as Arc<dyn PubSubTransport>,
        Arc::new(StaticProfiles),
        Arc::new(NoopPushDispatcher),
        SignalingConfig::default(),
        TransportConfig::default(),
    )
}

/// Counts invitation publishes observed on a target's channel.
async fn observe(
    transport: &Arc<MemoryPubSub>,
    target: &CallTarget,
) -> tokio::sync::broadcast::Receiver<huddle_core::events::Envelope> {
    let channel = target.invite_channel();
    transport.join(&channel).await.unwrap();
    transport.subscribe(&channel).await.unwrap()
}

fn drain_invitations(
    rx: &mut tokio::sync::broadcast::Receiver<huddle_core::events::Envelope>,
) -> usize {
    let mut count = 0;
    while let Ok(envelope) = rx.try_recv() {
        if matches!(envelope.event, SignalEvent::Invitation(_)) {
            count += 1;
        }
    }
    count
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_ring_stops_after_attempt_budget() {
    let transport = Arc::new(MemoryPubSub::new(64));
    let caller = engine(UserId::new(), &transport);
    let target = CallTarget::User(UserId::new());

    let mut observer = observe(&transport, &target).await;

    caller
        .send_invitation(target, "quiet colleague", false)
        .await
        .unwrap();

    // Exactly one immediate publish plus nine resends, all within 30s.
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(drain_invitations(&mut observer), 10);
    assert!(!caller.is_ringing(&target));

    // Nothing more ever arrives.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(drain_invitations(&mut observer), 0);
    caller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_sends_share_one_attempt_budget() {
    let transport = Arc::new(MemoryPubSub::new(64));
    let caller = engine(UserId::new(), &transport);
    let target = CallTarget::User(UserId::new());

    let mut observer = observe(&transport, &target).await;

    // Two concurrent sends for the same target: only one ring loop may
    // start, so the publish count stays within the single-ring budget.
    let (first, second) = tokio::join!(
        caller.send_invitation(target, "quiet colleague", false),
        caller.send_invitation(target, "quiet colleague", false),
    );
    first.unwrap();
    second.unwrap();

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(drain_invitations(&mut observer), 10);
    assert!(!caller.is_ringing(&target));
    caller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_accept_cancels_resend_loop() {
    let transport = Arc::new(MemoryPubSub::new(64));
    let alice = UserId::new();
    let bob = UserId::new();
    let caller = engine(alice, &transport);
    let callee = engine(bob, &transport);

    callee.watch_personal_channel().await.unwrap();
    let target = CallTarget::User(bob);
    let mut observer = observe(&transport, &target).await;

    caller.send_invitation(target, "bob", true).await.unwrap();

    let mut incoming = callee.incoming_invitation();
    tokio::time::timeout(Duration::from_secs(5), incoming.wait_for(|i| i.is_some()))
        .await
        .expect("invitation surfaced")
        .unwrap();

    let accepted = callee.accept_call().await.unwrap().unwrap();
    assert_eq!(accepted.caller_id, alice);
    assert!(accepted.is_video);
    assert_eq!(callee.session_state(&target), CallSessionState::Accepted);

    // Give the cancel a moment, then confirm the ring is over and no
    // further resends show up.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!caller.is_ringing(&target));

    drain_invitations(&mut observer);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(drain_invitations(&mut observer), 0);

    caller.shutdown();
    callee.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_end_call_clears_callee_pending() {
    let transport = Arc::new(MemoryPubSub::new(64));
    let caller = engine(UserId::new(), &transport);
    let callee_user = UserId::new();
    let callee = engine(callee_user, &transport);

    callee.watch_personal_channel().await.unwrap();
    let target = CallTarget::User(callee_user);

    caller.send_invitation(target, "callee", false).await.unwrap();

    let mut incoming = callee.incoming_invitation();
    tokio::time::timeout(Duration::from_secs(5), incoming.wait_for(|i| i.is_some()))
        .await
        .expect("invitation surfaced")
        .unwrap();

    caller.end_call(target).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), incoming.wait_for(|i| i.is_none()))
        .await
        .expect("pending cleared by ended")
        .unwrap();
    assert!(!caller.is_ringing(&target));
    assert_eq!(callee.session_state(&target), CallSessionState::Idle);

    caller.shutdown();
    callee.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_resend_refreshes_pending_for_same_caller() {
    let transport = Arc::new(MemoryPubSub::new(64));
    let alice = UserId::new();
    let caller = engine(alice, &transport);
    let callee_user = UserId::new();
    let callee = engine(callee_user, &transport);

    callee.watch_personal_channel().await.unwrap();
    let target = CallTarget::User(callee_user);

    caller.send_invitation(target, "callee", false).await.unwrap();

    let mut incoming = callee.incoming_invitation();
    tokio::time::timeout(Duration::from_secs(5), incoming.wait_for(|i| i.is_some()))
        .await
        .expect("invitation surfaced")
        .unwrap();

    // Ride through a few resend ticks; the pending slot still shows the
    // same caller and was refreshed, not replaced or dropped.
    tokio::time::sleep(Duration::from_secs(7)).await;
    let pending = incoming.borrow().clone().unwrap();
    assert_eq!(pending.caller_id, alice);
    assert_eq!(pending.target, target);

    caller.shutdown();
    callee.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_second_caller_does_not_displace_pending() {
    let transport = Arc::new(MemoryPubSub::new(64));
    let alice = UserId::new();
    let bruno = UserId::new();
    let first = engine(alice, &transport);
    let second = engine(bruno, &transport);
    let callee_user = UserId::new();
    let callee = engine(callee_user, &transport);

    callee.watch_personal_channel().await.unwrap();
    let target = CallTarget::User(callee_user);

    first.send_invitation(target, "callee", false).await.unwrap();

    let mut incoming = callee.incoming_invitation();
    tokio::time::timeout(Duration::from_secs(5), incoming.wait_for(|i| i.is_some()))
        .await
        .expect("first invitation surfaced")
        .unwrap();

    second.send_invitation(target, "callee", false).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let pending = incoming.borrow().clone().unwrap();
    assert_eq!(pending.caller_id, alice, "first-seen caller wins");

    first.shutdown();
    second.shutdown();
    callee.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_mode_selection_is_shared_per_room_and_sticky() {
    let transport = Arc::new(MemoryPubSub::new(64));
    let client = engine(UserId::new(), &transport);
    let room = RoomId::new();

    let mode = client.select_transport_mode(room).await.unwrap();
    assert_eq!(mode, TransportMode::Mesh);

    // Crowd arrives after the decision; it must not flip.
    let channel = huddle_core::types::ChannelKind::RoomPresence(room).to_channel_name();
    for _ in 0..8 {
        transport.join(&channel).await.unwrap();
    }
    assert_eq!(
        client.select_transport_mode(room).await.unwrap(),
        TransportMode::Mesh
    );

    client.shutdown();
}
