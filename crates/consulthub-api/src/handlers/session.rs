//! Session lifecycle handlers.
//!
//! Start, join and end return the facade's result objects; a failed
//! outcome is answered with 422 and the same body.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use consulthub_core::types::SessionId;
use consulthub_service::session::{
    EndSessionResult, JoinResult, SessionStatusView, StartSessionResult,
};
use consulthub_service::{CreateSessionRequest, EndSessionRequest};

use crate::dto::request::{NotesRequest, ParticipantRequest};
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

fn outcome_status(success: bool, ok: StatusCode) -> StatusCode {
    if success {
        ok
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

/// POST /api/sessions
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> (StatusCode, Json<StartSessionResult>) {
    let result = state.sessions.start_session(&req).await;
    (outcome_status(result.success, StatusCode::CREATED), Json(result))
}

/// GET /api/sessions/{id}
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<ApiResponse<SessionStatusView>>, ApiError> {
    let status = state.sessions.get_status(id).await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// POST /api/sessions/{id}/join
pub async fn join_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(req): Json<ParticipantRequest>,
) -> (StatusCode, Json<JoinResult>) {
    let result = state.sessions.join_session(id, req.user_id).await;
    (outcome_status(result.success, StatusCode::OK), Json(result))
}

/// POST /api/sessions/{id}/leave
pub async fn leave_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(req): Json<ParticipantRequest>,
) -> Result<StatusCode, ApiError> {
    state.sessions.leave_session(id, req.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/{id}/end
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(req): Json<EndSessionRequest>,
) -> (StatusCode, Json<EndSessionResult>) {
    let result = state.sessions.end_session(id, &req).await;
    (outcome_status(result.success, StatusCode::OK), Json(result))
}

/// PUT /api/sessions/{id}/notes
pub async fn update_notes(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(req): Json<NotesRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .update_notes(id, &req.notes, req.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
