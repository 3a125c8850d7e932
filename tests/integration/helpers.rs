//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use consulthub_api::{AppState, Stores};
use consulthub_core::config::AppConfig;
use consulthub_core::types::UserId;
use consulthub_realtime::connection::handle::OutboundFrame;
use consulthub_storage::{
    MemoryMessageStore, MemorySessionStore, MemoryWalletStore, WalletStore,
};

/// Client of every test session.
pub const CLIENT: i64 = 1;
/// Advisor of every test session.
pub const ADVISOR: i64 = 2;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Wired application state
    pub state: AppState,
    /// Wallet backing the billing engine
    pub wallet: MemoryWalletStore,
    /// Session rows
    pub sessions: MemorySessionStore,
}

impl TestApp {
    /// Create a new test application with default configuration
    pub fn new() -> Self {
        let wallet = MemoryWalletStore::new();
        let sessions = MemorySessionStore::new();
        let stores = Stores {
            sessions: Arc::new(sessions.clone()),
            messages: Arc::new(MemoryMessageStore::new()),
            wallet: Arc::new(wallet.clone()),
        };
        let state = consulthub_api::build_state(AppConfig::default(), stores);
        let router = consulthub_api::build_router(state.clone());

        Self {
            router,
            state,
            wallet,
            sessions,
        }
    }

    /// Give a user a wallet balance
    pub async fn fund(&self, user_id: i64, balance: f64) {
        self.wallet
            .set_user_balance(UserId::new(user_id), balance)
            .await;
    }

    /// Current wallet balance of a user
    pub async fn balance(&self, user_id: i64) -> f64 {
        self.wallet
            .get_user_balance(UserId::new(user_id))
            .await
            .expect("balance lookup failed")
    }

    /// Start a session through the API and return its id
    pub async fn start_session(&self, body: Value) -> i64 {
        let response = self.request("POST", "/api/sessions", Some(body)).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["session"]["id"]
            .as_i64()
            .expect("session id missing")
    }

    /// Send a request through the router
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Wait for the next text frame of the given envelope type.
pub async fn next_envelope(rx: &mut mpsc::Receiver<OutboundFrame>, kind: &str) -> Value {
    tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(frame) = rx.recv().await {
            if let OutboundFrame::Text(text) = frame {
                let value: Value = serde_json::from_str(&text).expect("invalid frame");
                if value["type"] == kind {
                    return value;
                }
            }
        }
        panic!("connection closed before a {kind} frame arrived");
    })
    .await
    .expect("timed out waiting for frame")
}
