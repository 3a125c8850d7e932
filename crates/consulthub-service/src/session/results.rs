//! Facade requests and result value objects.
//!
//! Domain and payment failures are carried here with `success = false`
//! instead of being returned as errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use consulthub_billing::BillingStatus;
use consulthub_core::types::{SessionId, TransactionId, UserId};
use consulthub_entity::session::{SessionMetrics, SessionStatus};

use super::model::ActiveSession;

/// Outcome of starting a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResult {
    /// Whether the session was created.
    pub success: bool,
    /// The created session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<ActiveSession>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StartSessionResult {
    pub(crate) fn started(session: ActiveSession) -> Self {
        Self {
            success: true,
            session: Some(session),
            error: None,
        }
    }

    pub(crate) fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            session: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of joining a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResult {
    /// Whether the user is now a participant.
    pub success: bool,
    /// Participants after joining.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_count: Option<usize>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Informational message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JoinResult {
    pub(crate) fn joined(participant_count: usize) -> Self {
        Self {
            success: true,
            participant_count: Some(participant_count),
            error: None,
            message: Some("Joined session".to_string()),
        }
    }

    pub(crate) fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            participant_count: None,
            error: Some(error.into()),
            message: None,
        }
    }
}

/// Who ends a session and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    /// User ending the session.
    pub ended_by: UserId,
    /// Why it ended.
    pub reason: String,
    /// Closing notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Billing outcome of an ended session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndBilling {
    /// Amount charged.
    pub cost: f64,
    /// Billed minutes.
    pub duration: i64,
    /// Payment transaction, when money moved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    /// Free session.
    pub is_free: bool,
}

/// Outcome of ending a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionResult {
    /// Whether the session is now completed.
    pub success: bool,
    /// What was billed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<EndBilling>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EndSessionResult {
    pub(crate) fn completed(billing: EndBilling) -> Self {
        Self {
            success: true,
            billing: Some(billing),
            error: None,
        }
    }

    pub(crate) fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            billing: None,
            error: Some(error.into()),
        }
    }
}

/// Current status of a session, active or completed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusView {
    /// Session id.
    pub id: SessionId,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Current participants (empty once completed).
    pub participants: Vec<UserId>,
    /// When the session opened.
    pub started_at: Option<DateTime<Utc>>,
    /// Billable minutes so far.
    pub duration: i64,
    /// Billing state folded from the ledger.
    pub billing_status: BillingStatus,
    /// Participation history (empty once completed).
    pub metrics: SessionMetrics,
}
