//! Real-time connection registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Interval between liveness probes sent to each connection, in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// A connection whose last heartbeat is older than this is stale.
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold_ms: u64,
    /// How often the stale-connection sweep runs, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Outbound buffer size per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Maximum accepted inbound frame size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ping_interval_seconds: default_ping_interval(),
            stale_threshold_ms: default_stale_threshold(),
            sweep_interval_seconds: default_sweep_interval(),
            channel_buffer_size: default_channel_buffer(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl RealtimeConfig {
    /// Ping interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Stale threshold as a [`Duration`].
    pub fn stale_threshold(&self) -> Duration {
        Duration::from_millis(self.stale_threshold_ms)
    }

    /// Sweep interval as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

fn default_ping_interval() -> u64 {
    30
}

fn default_stale_threshold() -> u64 {
    60_000
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_channel_buffer() -> usize {
    256
}

fn default_max_message_size() -> usize {
    65_536
}
