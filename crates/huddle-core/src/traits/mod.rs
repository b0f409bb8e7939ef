//! Trait seams to external collaborators.
//!
//! The client core never talks to the managed backend directly; it goes
//! through these traits so tests and the demo binary can substitute
//! in-memory implementations.

pub mod presence_store;
pub mod profile;
pub mod pubsub;
pub mod push;

pub use presence_store::PresenceStore;
pub use profile::{ProfileLookup, UserProfile};
pub use pubsub::PubSubTransport;
pub use push::{NoopPushDispatcher, PushDispatcher};
