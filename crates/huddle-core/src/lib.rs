//! # huddle-core
//!
//! Core crate for the Huddle realtime client. Contains typed identifiers,
//! configuration schemas, wire event definitions, the unified error system,
//! and the trait seams to external collaborators (pub/sub transport,
//! presence store, profile lookup, push dispatch).
//!
//! This crate has **no** internal dependencies on other Huddle crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::ClientError;
pub use result::ClientResult;
