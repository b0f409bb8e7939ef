//! Convenience result type alias for Huddle.

use crate::error::ClientError;

/// A specialized `Result` type for Huddle client operations.
///
/// Defined as a convenience so that every crate does not need to write
/// `Result<T, ClientError>` explicitly.
pub type ClientResult<T> = Result<T, ClientError>;
