//! Session lifecycle configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum participants in a single session.
    #[serde(default = "default_max_participants")]
    pub max_participants: usize,
    /// Period of the running-cost billing tick, in seconds.
    #[serde(default = "default_billing_tick")]
    pub billing_tick_seconds: u64,
    /// How often orphaned sessions are swept, in seconds.
    #[serde(default = "default_orphan_cleanup")]
    pub orphan_cleanup_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_participants: default_max_participants(),
            billing_tick_seconds: default_billing_tick(),
            orphan_cleanup_seconds: default_orphan_cleanup(),
        }
    }
}

impl SessionConfig {
    /// Billing tick period as a [`Duration`].
    pub fn billing_tick(&self) -> Duration {
        Duration::from_secs(self.billing_tick_seconds)
    }

    /// Orphan cleanup interval as a [`Duration`].
    pub fn orphan_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.orphan_cleanup_seconds)
    }
}

fn default_max_participants() -> usize {
    10
}

fn default_billing_tick() -> u64 {
    60
}

fn default_orphan_cleanup() -> u64 {
    300
}
