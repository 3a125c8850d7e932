//! Request DTOs.

use serde::Deserialize;

use consulthub_core::types::UserId;

/// Body of join and leave requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRequest {
    /// Acting user.
    pub user_id: UserId,
}

/// Body of a notes update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesRequest {
    /// Acting user (must be the advisor).
    pub user_id: UserId,
    /// New notes.
    pub notes: String,
}

/// Query of the WebSocket upgrade.
#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    /// Connecting user, asserted by the upstream authentication layer.
    pub user_id: UserId,
}
