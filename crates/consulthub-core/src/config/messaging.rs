//! Chat delivery configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Message delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Maximum queued messages per offline recipient.
    #[serde(default = "default_queue_capacity")]
    pub offline_queue_capacity: usize,
    /// Auto-stop delay for typing indicators, in milliseconds.
    #[serde(default = "default_typing_timeout")]
    pub typing_timeout_ms: u64,
    /// Maximum chat message length in characters.
    #[serde(default = "default_max_length")]
    pub max_message_length: usize,
    /// How long delivery receipts are retained, in hours.
    #[serde(default = "default_retention")]
    pub tracking_retention_hours: u64,
    /// How often delivery tracking is garbage-collected, in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub tracking_cleanup_seconds: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            offline_queue_capacity: default_queue_capacity(),
            typing_timeout_ms: default_typing_timeout(),
            max_message_length: default_max_length(),
            tracking_retention_hours: default_retention(),
            tracking_cleanup_seconds: default_cleanup_interval(),
        }
    }
}

impl MessagingConfig {
    /// Typing timeout as a [`Duration`].
    pub fn typing_timeout(&self) -> Duration {
        Duration::from_millis(self.typing_timeout_ms)
    }

    /// Tracking retention window as a [`Duration`].
    pub fn tracking_retention(&self) -> Duration {
        Duration::from_secs(self.tracking_retention_hours * 3600)
    }

    /// Tracking cleanup interval as a [`Duration`].
    pub fn tracking_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.tracking_cleanup_seconds)
    }
}

fn default_queue_capacity() -> usize {
    100
}

fn default_typing_timeout() -> u64 {
    5000
}

fn default_max_length() -> usize {
    10_000
}

fn default_retention() -> u64 {
    24
}

fn default_cleanup_interval() -> u64 {
    3600
}
