//! Response DTOs.

use serde::Serialize;

use consulthub_billing::BillingMetrics;
use consulthub_realtime::metrics::MetricsSnapshot;
use consulthub_service::SessionStats;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// Live connections.
    pub connections: usize,
    /// Real-time counters.
    pub realtime: MetricsSnapshot,
    /// Active session totals.
    pub sessions: SessionStats,
    /// Payment counters.
    pub billing: BillingMetrics,
}
