//! # huddle-transport
//!
//! In-memory implementation of the Huddle pub/sub transport, used by the
//! demo binary and the test suite. Production deployments substitute the
//! managed realtime messaging service behind the same
//! [`huddle_core::traits::PubSubTransport`] trait.

pub mod memory;

pub use memory::MemoryPubSub;
