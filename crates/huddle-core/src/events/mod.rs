//! Wire event definitions for the signaling pub/sub channels.

pub mod call;

pub use call::{CallInvitation, Envelope, SignalEvent, WIRE_VERSION};
