//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use consulthub_core::config::AppConfig;
use consulthub_realtime::RealtimeEngine;
use consulthub_service::SessionFacade;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`; cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Real-time engine (registry, signaling, chat delivery).
    pub realtime: Arc<RealtimeEngine>,
    /// Session orchestration.
    pub sessions: SessionFacade,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}
