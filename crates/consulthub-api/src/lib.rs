//! # consulthub-api
//!
//! HTTP API layer for ConsultHub built on Axum.
//!
//! Provides the session REST endpoints over the session facade, the
//! WebSocket upgrade that binds a socket to the connection registry, the
//! health endpoint, CORS and request tracing, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{Stores, build_state, shutdown, spawn_background};
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
