//! # huddle-signaling
//!
//! Call signaling subsystem for the Huddle realtime client. Provides:
//!
//! - Outbound ringer with bounded retry and accept-cancellation
//! - Inbound invitation inbox with staleness and duplicate suppression
//! - Time-bounded accepted-call de-dup set
//! - One-shot sticky transport mode selection (mesh vs. relay)
//! - The top-level [`SignalingEngine`] exposed to the UI layer
//!
//! There is no central coordinator: every guarantee is derived from
//! retries, de-duplication, and staleness checks on the receiving side.

pub mod dedup;
pub mod engine;
pub mod inbox;
pub mod mode;
pub mod ringer;
pub mod session;

pub use dedup::AcceptedCallSet;
pub use engine::SignalingEngine;
pub use inbox::InvitationInbox;
pub use mode::{TransportMode, TransportModeSelector};
pub use ringer::OutboundRinger;
pub use session::{CallSessionState, SessionMap};
