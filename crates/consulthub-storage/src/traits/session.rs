//! Session persistence trait.

use async_trait::async_trait;

use consulthub_core::result::AppResult;
use consulthub_core::types::SessionId;
use consulthub_entity::session::{NewSession, SessionBilling, SessionEnd, SessionPatch, SessionRecord};

/// Durable storage for session rows.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Insert a new session and return it with its assigned id.
    async fn create_session(&self, session: &NewSession) -> AppResult<SessionRecord>;

    /// Apply a partial update. Returns `None` if the row does not exist.
    async fn update_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> AppResult<Option<SessionRecord>>;

    /// Mark a session completed with its final figures and return the
    /// durable billing result.
    async fn end_session(&self, id: SessionId, end: &SessionEnd) -> AppResult<SessionBilling>;

    /// Fetch a session row.
    async fn get_session(&self, id: SessionId) -> AppResult<Option<SessionRecord>>;
}
