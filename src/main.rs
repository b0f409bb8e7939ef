//! Huddle demo: two simulated clients on one in-memory transport.
//!
//! Wires the presence and signaling subsystems together the way a real
//! client shell would, then walks one full call: ring, accept, transport
//! mode selection, hang up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::{fmt, EnvFilter};

use huddle_core::config::ClientConfig;
use huddle_core::error::ClientError;
use huddle_core::traits::{
    NoopPushDispatcher, PresenceStore, ProfileLookup, PubSubTransport, UserProfile,
};
use huddle_core::types::{CallTarget, RoomId, UserId};
use huddle_presence::{HeartbeatService, MemoryPresenceStore, PresenceRoster};
use huddle_signaling::SignalingEngine;
use huddle_transport::MemoryPubSub;

/// Fixed profile directory for the demo users.
struct DemoProfiles {
    profiles: HashMap<UserId, UserProfile>,
}

#[async_trait]
impl ProfileLookup for DemoProfiles {
    async fn profile(&self, user_id: UserId) -> Result<UserProfile, ClientError> {
        self.profiles
            .get(&user_id)
            .cloned()
            .ok_or_else(|| ClientError::profile(format!("unknown user {user_id}")))
    }
}

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Demo error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<ClientConfig, ClientError> {
    let env = std::env::var("HUDDLE_ENV").unwrap_or_else(|_| "development".to_string());
    ClientConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &ClientConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

async fn run(config: ClientConfig) -> Result<(), ClientError> {
    tracing::info!("Starting Huddle demo v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Shared backend stand-ins ─────────────────────────
    let transport = Arc::new(MemoryPubSub::new(config.transport.channel_buffer_size));
    let presence_store = Arc::new(MemoryPresenceStore::new());

    let alice = UserId::new();
    let bob = UserId::new();
    let profiles = Arc::new(DemoProfiles {
        profiles: HashMap::from([
            (
                alice,
                UserProfile {
                    display_name: "Alice Moreau".to_string(),
                    avatar_url: None,
                },
            ),
            (
                bob,
                UserProfile {
                    display_name: "Bob Okafor".to_string(),
                    avatar_url: None,
                },
            ),
        ]),
    });

    // ── Step 2: Presence, heartbeats and a roster ───────────────
    let alice_heartbeat = Arc::new(HeartbeatService::new(
        alice,
        Arc::clone(&presence_store) as Arc<dyn PresenceStore>,
        config.presence.clone(),
    ));
    let bob_heartbeat = Arc::new(HeartbeatService::new(
        bob,
        Arc::clone(&presence_store) as Arc<dyn PresenceStore>,
        config.presence.clone(),
    ));
    alice_heartbeat.start();
    bob_heartbeat.start();

    let roster = Arc::new(PresenceRoster::new(config.presence.clone()));
    roster
        .start(Arc::clone(&presence_store) as Arc<dyn PresenceStore>)
        .await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    tracing::info!(
        alice = ?roster.effective_status(alice),
        bob = ?roster.effective_status(bob),
        "presence established"
    );

    // ── Step 3: Signaling engines ────────────────────────────────
    let alice_engine = SignalingEngine::new(
        alice,
        Arc::clone(&transport) as Arc<dyn PubSubTransport>,
        Arc::clone(&profiles) as Arc<dyn ProfileLookup>,
        Arc::new(NoopPushDispatcher),
        config.signaling.clone(),
        config.transport.clone(),
    );
    let bob_engine = SignalingEngine::new(
        bob,
        Arc::clone(&transport) as Arc<dyn PubSubTransport>,
        Arc::clone(&profiles) as Arc<dyn ProfileLookup>,
        Arc::new(NoopPushDispatcher),
        config.signaling.clone(),
        config.transport.clone(),
    );

    // Recipients must be subscribed before any ringing begins.
    bob_engine.watch_personal_channel().await?;

    // ── Step 4: Ring and accept ──────────────────────────────────
    let target = CallTarget::User(bob);
    alice_engine.send_invitation(target, "Bob Okafor", true).await?;
    tracing::info!("Alice is ringing Bob");

    let mut incoming = bob_engine.incoming_invitation();
    incoming
        .wait_for(|i| i.is_some())
        .await
        .map_err(|e| ClientError::internal(format!("invitation feed closed: {e}")))?;

    let invitation = bob_engine.accept_call().await?;
    if let Some(invitation) = invitation {
        tracing::info!(caller = %invitation.caller_display_name, "Bob accepted the call");
    }

    alice_heartbeat.set_in_call(true).await;
    bob_heartbeat.set_in_call(true).await;

    // ── Step 5: Transport mode for the call room ─────────────────
    let room = RoomId::new();
    let mode = alice_engine.select_transport_mode(room).await?;
    tracing::info!(?mode, "transport mode selected for the call");

    // ── Step 6: Hang up and tear down ────────────────────────────
    tokio::time::sleep(Duration::from_secs(1)).await;
    alice_engine.end_call(target).await?;
    alice_heartbeat.set_in_call(false).await;
    bob_heartbeat.set_in_call(false).await;
    tracing::info!("call ended");

    alice_engine.shutdown();
    bob_engine.shutdown();
    roster.stop();
    alice_heartbeat.stop();
    bob_heartbeat.stop();

    tracing::info!("Huddle demo finished");
    Ok(())
}
