//! Client configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod presence;
pub mod signaling;
pub mod transport;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub use self::logging::LoggingConfig;
pub use self::presence::PresenceConfig;
pub use self::signaling::SignalingConfig;
pub use self::transport::TransportConfig;

/// Root client configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// (default.toml + environment overlay + `HUDDLE__` env vars).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Heartbeat and status-resolution settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Call invitation protocol and mode selector settings.
    #[serde(default)]
    pub signaling: SignalingConfig,
    /// Pub/sub transport settings.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific
    /// overlay and environment variables prefixed with `HUDDLE`.
    pub fn load(env: &str) -> Result<Self, ClientError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HUDDLE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ClientError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| ClientError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let config = ClientConfig::default();
        assert_eq!(config.presence.heartbeat_interval_seconds, 8);
        assert_eq!(config.presence.stale_window_seconds, 30);
        assert_eq!(config.signaling.resend_interval_seconds, 3);
        assert_eq!(config.signaling.max_attempts, 10);
        assert_eq!(config.signaling.mesh_participant_limit, 5);
    }

    #[test]
    fn test_empty_toml_deserializes() {
        let config: ClientConfig = toml_from_str("");
        assert_eq!(config.presence.idle_timeout_seconds, 300);
        assert_eq!(config.signaling.accept_dedup_ttl_seconds, 120);
    }

    fn toml_from_str(s: &str) -> ClientConfig {
        config::Config::builder()
            .add_source(config::File::from_str(s, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
