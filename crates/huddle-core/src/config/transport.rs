//! Pub/sub transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pub/sub transport tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Internal buffer size for per-channel broadcast queues.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Warm-up delay between joining a channel and the first publish a
    /// sender expects its own subscription to observe, in milliseconds.
    #[serde(default = "default_join_warmup")]
    pub join_warmup_ms: u64,
}

impl TransportConfig {
    /// Join warm-up as a [`Duration`].
    pub fn join_warmup(&self) -> Duration {
        Duration::from_millis(self.join_warmup_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            join_warmup_ms: default_join_warmup(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_join_warmup() -> u64 {
    200
}
