//! Routing, health and error mapping.

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::{ADVISOR, CLIENT, TestApp};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["connections"], 0);
    assert_eq!(response.body["data"]["sessions"]["totalActive"], 0);
    assert_eq!(response.body["data"]["billing"]["successRate"], 100.0);
}

#[tokio::test]
async fn test_ws_upgrade_requires_upgrade_request() {
    let app = TestApp::new();

    let response = app.request("GET", "/ws", None).await;
    assert!(response.status.is_client_error(), "got {}", response.status);

    let response = app.request("GET", "/ws?user_id=1", None).await;
    assert!(response.status.is_client_error(), "got {}", response.status);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/sessions/999", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_start_request_is_rejected() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/sessions",
            Some(json!({
                "userId": CLIENT,
                "advisorId": CLIENT,
                "sessionType": "chat",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["success"], false);
    assert!(response.body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_leave_without_membership_is_session_error() {
    let app = TestApp::new();
    let id = app
        .start_session(json!({
            "userId": CLIENT,
            "advisorId": ADVISOR,
            "sessionType": "chat",
        }))
        .await;

    let response = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/leave"),
            Some(json!({ "userId": 77 })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "SESSION_ERROR");
}
