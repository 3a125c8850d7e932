//! Persisted session record and the value objects exchanged with storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use consulthub_core::types::{SessionId, UserId};

use super::status::{SessionStatus, SessionType};

/// A participant joining or leaving a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantEvent {
    /// The participant.
    pub user_id: UserId,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

/// Participation metrics collected over a session's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    /// When the session was started or scheduled.
    pub start_time: Option<DateTime<Utc>>,
    /// Every join, in order.
    pub participant_joins: Vec<ParticipantEvent>,
    /// Every leave, in order.
    pub participant_leaves: Vec<ParticipantEvent>,
}

/// Durable session row owned by the persistence collaborator.
///
/// Outlives the in-memory active session: it is the record of what was
/// billed once the session completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Storage-assigned identifier.
    pub id: SessionId,
    /// The client.
    pub user_id: UserId,
    /// The advisor.
    pub advisor_id: UserId,
    /// Kind of consultation.
    pub session_type: SessionType,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Price per started minute, in minor units.
    pub rate_per_minute: f64,
    /// Booked start time for scheduled sessions.
    pub scheduled_time: Option<DateTime<Utc>>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// When the session was opened for participants.
    pub started_at: Option<DateTime<Utc>>,
    /// When billing started.
    pub actual_start_time: Option<DateTime<Utc>>,
    /// When billing stopped.
    pub actual_end_time: Option<DateTime<Utc>>,
    /// Billable minutes.
    pub actual_duration: Option<i64>,
    /// Running or final billed amount, in minor units.
    pub billed_amount: Option<f64>,
    /// Why the session ended.
    pub end_reason: Option<String>,
    /// Advisor notes.
    pub notes: Option<String>,
}

/// Data required to create a session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    /// The client.
    pub user_id: UserId,
    /// The advisor.
    pub advisor_id: UserId,
    /// Kind of consultation.
    pub session_type: SessionType,
    /// Initial status.
    pub status: SessionStatus,
    /// Price per started minute.
    pub rate_per_minute: f64,
    /// Booked start time.
    pub scheduled_time: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Open time for unscheduled sessions.
    pub started_at: Option<DateTime<Utc>>,
}

/// Partial update of a session row. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    /// New status.
    pub status: Option<SessionStatus>,
    /// Billing start.
    pub actual_start_time: Option<DateTime<Utc>>,
    /// Billing end.
    pub actual_end_time: Option<DateTime<Utc>>,
    /// Billable minutes so far.
    pub actual_duration: Option<i64>,
    /// Amount billed so far.
    pub billed_amount: Option<f64>,
    /// Advisor notes.
    pub notes: Option<String>,
}

/// Final figures handed to storage when a session ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnd {
    /// Why the session ended.
    pub end_reason: String,
    /// Optional closing notes.
    pub notes: Option<String>,
    /// Billing end.
    pub actual_end_time: DateTime<Utc>,
    /// Final billable minutes.
    pub actual_duration: i64,
    /// Final billed amount.
    pub billed_amount: f64,
}

/// Billing figures of an ended session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBilling {
    /// Amount billed, in minor units.
    pub billed_amount: f64,
    /// Billable minutes.
    pub actual_duration: i64,
}
