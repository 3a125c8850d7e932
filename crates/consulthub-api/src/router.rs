//! Route definitions for the ConsultHub HTTP API.
//!
//! Session routes are mounted under `/api`; the WebSocket upgrade lives at
//! `/ws`. The router receives `AppState` and passes it to every handler via
//! Axum's `State` extractor.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(session_routes())
        .route("/health", get(handlers::health::health));

    let cors = build_cors_layer(&state.config.server);

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Session lifecycle endpoints.
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(handlers::session::start_session))
        .route("/sessions/{id}", get(handlers::session::get_session_status))
        .route("/sessions/{id}/join", post(handlers::session::join_session))
        .route("/sessions/{id}/leave", post(handlers::session::leave_session))
        .route("/sessions/{id}/end", post(handlers::session::end_session))
        .route("/sessions/{id}/notes", put(handlers::session::update_notes))
}
