//! User profile lookup trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::ClientResult;
use crate::types::UserId;

/// Display name and avatar for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Human-readable display name.
    pub display_name: String,
    /// Avatar URL, if the user has one.
    pub avatar_url: Option<String>,
}

/// Resolves display information for a user id.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Look up the profile for a user.
    async fn profile(&self, user_id: UserId) -> ClientResult<UserProfile>;
}
