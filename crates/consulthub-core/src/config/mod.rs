//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a default so an empty file is valid.

pub mod app;
pub mod billing;
pub mod logging;
pub mod messaging;
pub mod realtime;
pub mod session;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::billing::BillingConfig;
pub use self::logging::LoggingConfig;
pub use self::messaging::MessagingConfig;
pub use self::realtime::RealtimeConfig;
pub use self::session::SessionConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Real-time connection settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Chat delivery settings.
    #[serde(default)]
    pub messaging: MessagingConfig,
    /// Billing and payout settings.
    #[serde(default)]
    pub billing: BillingConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `{path}` with an optional `config/{env}` overlay and
    /// environment variables prefixed with `CONSULTHUB__`.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CONSULTHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").expect("defaults");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.session.max_participants, 10);
        assert_eq!(config.session.billing_tick_seconds, 60);
        assert_eq!(config.messaging.offline_queue_capacity, 100);
        assert_eq!(config.messaging.typing_timeout_ms, 5000);
        assert_eq!(config.realtime.stale_threshold_ms, 60_000);
        assert!((config.billing.platform_fee_rate - 0.20).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"session": {"max_participants": 4}}"#).expect("parse");
        assert_eq!(config.session.max_participants, 4);
        assert_eq!(config.session.orphan_cleanup_seconds, 300);
    }
}
