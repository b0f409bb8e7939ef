//! # huddle-presence
//!
//! Presence subsystem for the Huddle realtime client. Provides:
//!
//! - Liveness heartbeat publishing the local user's presence row
//! - Manual/derived status resolution (DND > in-call > idle > online)
//! - Presence roster with staleness-based offline inference
//! - In-memory presence store for tests and the demo binary

pub mod heartbeat;
pub mod memory;
pub mod resolver;
pub mod roster;

pub use heartbeat::HeartbeatService;
pub use memory::MemoryPresenceStore;
pub use resolver::StatusResolver;
pub use roster::PresenceRoster;
