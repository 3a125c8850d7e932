//! In-memory session state and manager inputs.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use consulthub_core::error::AppError;
use consulthub_core::result::AppResult;
use consulthub_core::types::{SessionId, UserId, ceil_minutes, round_currency};
use consulthub_entity::session::{
    ParticipantEvent, SessionMetrics, SessionRecord, SessionStatus, SessionType,
};

const MILLIS_PER_MINUTE: u128 = 60_000;

/// Authoritative state of a session that has not completed yet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
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
    /// Current participants (at most the configured limit).
    pub participants: BTreeSet<UserId>,
    /// Price per started minute.
    pub rate_per_minute: f64,
    /// Booked start time.
    pub scheduled_time: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When the session was opened for participants.
    pub started_at: Option<DateTime<Utc>>,
    /// When billing started.
    pub actual_start_time: Option<DateTime<Utc>>,
    /// When billing stopped.
    pub actual_end_time: Option<DateTime<Utc>>,
    /// Billable minutes as of the last tick.
    pub actual_duration: Option<i64>,
    /// Running billed amount as of the last tick.
    pub billed_amount: Option<f64>,
    /// Advisor notes.
    pub notes: Option<String>,
    /// Participation history.
    pub metrics: SessionMetrics,
    /// Monotonic clock reading taken when the session became active.
    #[serde(skip)]
    pub(crate) active_since: Option<Instant>,
    /// Set while a caller is finalizing billing for this session.
    #[serde(skip)]
    pub(crate) end_claimed: bool,
}

impl ActiveSession {
    /// Mirror a freshly created row into memory.
    pub(crate) fn from_record(record: SessionRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            advisor_id: record.advisor_id,
            session_type: record.session_type,
            status: record.status,
            participants: BTreeSet::new(),
            rate_per_minute: record.rate_per_minute,
            scheduled_time: record.scheduled_time,
            created_at: record.created_at,
            started_at: record.started_at,
            actual_start_time: record.actual_start_time,
            actual_end_time: record.actual_end_time,
            actual_duration: record.actual_duration,
            billed_amount: record.billed_amount,
            notes: record.notes,
            metrics: SessionMetrics {
                start_time: record.started_at.or(record.scheduled_time),
                ..SessionMetrics::default()
            },
            active_since: None,
            end_claimed: false,
        }
    }

    /// Whether the session never accrues cost.
    pub fn is_free(&self) -> bool {
        self.rate_per_minute == 0.0 || self.session_type.is_free()
    }

    /// Whether `user_id` is the client, the advisor or a participant.
    pub fn involves(&self, user_id: UserId) -> bool {
        self.user_id == user_id || self.advisor_id == user_id || self.participants.contains(&user_id)
    }

    /// Seats taken, counting the client and advisor of a scheduled session
    /// who attach when it opens.
    pub fn occupied_seats(&self) -> usize {
        let mut seats = self.participants.len();
        if self.status == SessionStatus::Scheduled {
            seats += [self.user_id, self.advisor_id]
                .iter()
                .filter(|id| !self.participants.contains(id))
                .count();
        }
        seats
    }

    /// Amount owed for `minutes` of billable time.
    pub fn cost_for(&self, minutes: i64) -> f64 {
        if self.is_free() {
            0.0
        } else {
            round_currency(minutes as f64 * self.rate_per_minute)
        }
    }

    /// Minutes elapsed since the session became active, rounded up.
    pub(crate) fn elapsed_minutes(&self, now: Instant) -> Option<i64> {
        let since = self.active_since?;
        let millis = now.saturating_duration_since(since).as_millis();
        Some(millis.div_ceil(MILLIS_PER_MINUTE) as i64)
    }

    /// Billable minutes up to `end`, with a one minute floor once billing
    /// has started.
    pub fn duration_until(&self, end: DateTime<Utc>) -> i64 {
        match self.actual_start_time {
            Some(start) => ceil_minutes(start, end).max(1),
            None => 0,
        }
    }

    pub(crate) fn record_join(&mut self, user_id: UserId, at: DateTime<Utc>) {
        self.participants.insert(user_id);
        self.metrics.participant_joins.push(ParticipantEvent {
            user_id,
            timestamp: at,
        });
    }

    pub(crate) fn record_leave(&mut self, user_id: UserId, at: DateTime<Utc>) {
        self.participants.remove(&user_id);
        self.metrics.participant_leaves.push(ParticipantEvent {
            user_id,
            timestamp: at,
        });
    }
}

/// Request to open a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// The client.
    pub user_id: UserId,
    /// The advisor.
    pub advisor_id: UserId,
    /// Kind of consultation.
    pub session_type: SessionType,
    /// Booked start time; unscheduled sessions open immediately.
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    /// Price per started minute; defaults to free.
    #[serde(default)]
    pub rate_per_minute: Option<f64>,
}

impl CreateSessionRequest {
    /// Check ids and rate before any side effect.
    pub fn validate(&self) -> AppResult<()> {
        if !self.user_id.is_valid() {
            return Err(AppError::validation("Invalid user id"));
        }
        if !self.advisor_id.is_valid() {
            return Err(AppError::validation("Invalid advisor id"));
        }
        if self.user_id == self.advisor_id {
            return Err(AppError::validation("Client and advisor must be different users"));
        }
        if let Some(rate) = self.rate_per_minute {
            if !rate.is_finite() || rate < 0.0 {
                return Err(AppError::validation("Rate per minute must not be negative"));
            }
        }
        Ok(())
    }
}

/// Final figures and reason for ending a session.
#[derive(Debug, Clone, Default)]
pub struct EndSessionParams {
    /// Why the session ended.
    pub reason: String,
    /// Closing notes.
    pub notes: Option<String>,
    /// Amount already charged; computed locally when absent.
    pub billed_amount: Option<f64>,
    /// Billed minutes; computed locally when absent.
    pub duration: Option<i64>,
}

/// Aggregate view of the active sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Sessions held in memory.
    pub total_active: usize,
    /// Count per status.
    pub by_status: BTreeMap<String, usize>,
    /// Count per session type.
    pub by_type: BTreeMap<String, usize>,
    /// Mean running duration of sessions that have one.
    pub average_duration: f64,
    /// Sum of running billed amounts.
    pub total_billed: f64,
}
