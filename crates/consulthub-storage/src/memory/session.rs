//! In-memory session store using a Tokio mutex.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use consulthub_core::error::AppError;
use consulthub_core::result::AppResult;
use consulthub_core::types::SessionId;
use consulthub_entity::session::{
    NewSession, SessionBilling, SessionEnd, SessionPatch, SessionRecord, SessionStatus,
};

use crate::traits::SessionStore;

#[derive(Debug, Default)]
struct InnerState {
    next_id: i64,
    rows: HashMap<SessionId, SessionRecord>,
}

/// In-memory [`SessionStore`].
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    /// Returns `true` if no rows are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: &NewSession) -> AppResult<SessionRecord> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = SessionId::new(state.next_id);

        let record = SessionRecord {
            id,
            user_id: session.user_id,
            advisor_id: session.advisor_id,
            session_type: session.session_type,
            status: session.status,
            rate_per_minute: session.rate_per_minute,
            scheduled_time: session.scheduled_time,
            created_at: session.created_at,
            started_at: session.started_at,
            actual_start_time: None,
            actual_end_time: None,
            actual_duration: None,
            billed_amount: None,
            end_reason: None,
            notes: None,
        };

        state.rows.insert(id, record.clone());
        debug!(session_id = %id, "Session row created");
        Ok(record)
    }

    async fn update_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> AppResult<Option<SessionRecord>> {
        let mut state = self.state.lock().await;
        let Some(row) = state.rows.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(start) = patch.actual_start_time {
            row.actual_start_time = Some(start);
        }
        if let Some(end) = patch.actual_end_time {
            row.actual_end_time = Some(end);
        }
        if let Some(duration) = patch.actual_duration {
            row.actual_duration = Some(duration);
        }
        if let Some(amount) = patch.billed_amount {
            row.billed_amount = Some(amount);
        }
        if let Some(notes) = &patch.notes {
            row.notes = Some(notes.clone());
        }

        Ok(Some(row.clone()))
    }

    async fn end_session(&self, id: SessionId, end: &SessionEnd) -> AppResult<SessionBilling> {
        let mut state = self.state.lock().await;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))?;

        row.status = SessionStatus::Completed;
        row.actual_end_time = Some(end.actual_end_time);
        row.actual_duration = Some(end.actual_duration);
        row.billed_amount = Some(end.billed_amount);
        row.end_reason = Some(end.end_reason.clone());
        if end.notes.is_some() {
            row.notes = end.notes.clone();
        }

        Ok(SessionBilling {
            billed_amount: end.billed_amount,
            actual_duration: end.actual_duration,
        })
    }

    async fn get_session(&self, id: SessionId) -> AppResult<Option<SessionRecord>> {
        Ok(self.state.lock().await.rows.get(&id).cloned())
    }
}
