//! Session start, membership, billing and notes across the whole stack.

use axum::http::StatusCode;
use serde_json::json;

use consulthub_core::types::UserId;

use crate::helpers::{ADVISOR, CLIENT, TestApp, next_envelope};

fn paid_chat() -> serde_json::Value {
    json!({
        "userId": CLIENT,
        "advisorId": ADVISOR,
        "sessionType": "chat",
        "ratePerMinute": 2.0,
    })
}

#[tokio::test]
async fn test_paid_session_is_billed_on_end() {
    let app = TestApp::new();
    app.fund(CLIENT, 10.0).await;

    let (_client, mut client_rx) = app.state.realtime.connect(UserId::new(CLIENT));
    let id = app.start_session(paid_chat()).await;

    let update = next_envelope(&mut client_rx, "session_update").await;
    assert_eq!(update["payload"]["sessionId"], id);
    assert_eq!(update["payload"]["status"], "active");

    let status = app.request("GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["data"]["status"], "active");
    assert_eq!(status.body["data"]["billingStatus"]["status"], "pending");

    let end = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/end"),
            Some(json!({ "endedBy": CLIENT, "reason": "done" })),
        )
        .await;
    assert_eq!(end.status, StatusCode::OK, "{:?}", end.body);
    assert_eq!(end.body["success"], true);
    assert_eq!(end.body["billing"]["cost"], 2.0);
    assert_eq!(end.body["billing"]["duration"], 1);
    assert!(end.body["billing"]["transactionId"].is_number());

    let update = next_envelope(&mut client_rx, "session_update").await;
    assert_eq!(update["payload"]["status"], "completed");

    assert_eq!(app.balance(CLIENT).await, 8.0);

    let status = app.request("GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status.body["data"]["status"], "completed");
    assert_eq!(status.body["data"]["billingStatus"]["status"], "completed");
    assert_eq!(status.body["data"]["billingStatus"]["totalAmount"], 2.0);

    let again = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/end"),
            Some(json!({ "endedBy": CLIENT, "reason": "done" })),
        )
        .await;
    assert_eq!(again.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(again.body["error"], "Session not found");
    assert_eq!(app.balance(CLIENT).await, 8.0);
}

#[tokio::test]
async fn test_failed_payment_keeps_session_active() {
    let app = TestApp::new();
    let id = app.start_session(paid_chat()).await;

    let end = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/end"),
            Some(json!({ "endedBy": ADVISOR, "reason": "done" })),
        )
        .await;

    assert_eq!(end.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(end.body["error"], "Payment processing failed: Insufficient funds");

    let status = app.request("GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status.body["data"]["status"], "active");

    app.fund(CLIENT, 5.0).await;
    let end = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/end"),
            Some(json!({ "endedBy": ADVISOR, "reason": "retry" })),
        )
        .await;
    assert_eq!(end.status, StatusCode::OK, "{:?}", end.body);
    assert_eq!(app.balance(CLIENT).await, 3.0);
}

#[tokio::test]
async fn test_free_session_ends_without_charge() {
    let app = TestApp::new();
    let id = app
        .start_session(json!({
            "userId": CLIENT,
            "advisorId": ADVISOR,
            "sessionType": "free_consultation",
            "ratePerMinute": 3.0,
        }))
        .await;

    let end = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/end"),
            Some(json!({ "endedBy": CLIENT, "reason": "done" })),
        )
        .await;

    assert_eq!(end.status, StatusCode::OK);
    assert_eq!(end.body["billing"]["cost"], 0.0);
    assert_eq!(end.body["billing"]["isFree"], true);
    assert!(end.body["billing"].get("transactionId").is_none());
}

#[tokio::test]
async fn test_outsider_cannot_end_session() {
    let app = TestApp::new();
    let id = app.start_session(paid_chat()).await;

    let end = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/end"),
            Some(json!({ "endedBy": 99, "reason": "done" })),
        )
        .await;

    assert_eq!(end.status, StatusCode::UNPROCESSABLE_ENTITY);
    let status = app.request("GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status.body["data"]["status"], "active");
}

#[tokio::test]
async fn test_join_and_leave() {
    let app = TestApp::new();
    let id = app.start_session(paid_chat()).await;

    let (_advisor, mut advisor_rx) = app.state.realtime.connect(UserId::new(ADVISOR));
    let (_guest, _guest_rx) = app.state.realtime.connect(UserId::new(3));
    assert_eq!(app.state.sessions.manager().restore_memberships(UserId::new(ADVISOR)), 1);

    let join = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/join"),
            Some(json!({ "userId": 3 })),
        )
        .await;
    assert_eq!(join.status, StatusCode::OK);
    assert_eq!(join.body["participantCount"], 3);

    let joined = next_envelope(&mut advisor_rx, "session_join").await;
    assert_eq!(joined["payload"]["userId"], 3);

    let again = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/join"),
            Some(json!({ "userId": 3 })),
        )
        .await;
    assert_eq!(again.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(again.body["error"], "User already in session");

    let leave = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/leave"),
            Some(json!({ "userId": 3 })),
        )
        .await;
    assert_eq!(leave.status, StatusCode::NO_CONTENT);

    let left = next_envelope(&mut advisor_rx, "session_leave").await;
    assert_eq!(left["payload"]["userId"], 3);

    let missing = app
        .request(
            "POST",
            "/api/sessions/404/join",
            Some(json!({ "userId": 3 })),
        )
        .await;
    assert_eq!(missing.body["error"], "Session not found");
}

#[tokio::test]
async fn test_notes_rules() {
    let app = TestApp::new();
    app.fund(CLIENT, 10.0).await;
    let id = app.start_session(paid_chat()).await;
    let path = format!("/api/sessions/{id}/notes");

    let active = app
        .request("PUT", &path, Some(json!({ "userId": ADVISOR, "notes": "x" })))
        .await;
    assert_eq!(active.status, StatusCode::CONFLICT);

    app.request(
        "POST",
        &format!("/api/sessions/{id}/end"),
        Some(json!({ "endedBy": CLIENT, "reason": "done" })),
    )
    .await;

    let client = app
        .request("PUT", &path, Some(json!({ "userId": CLIENT, "notes": "x" })))
        .await;
    assert_eq!(client.status, StatusCode::FORBIDDEN);

    let advisor = app
        .request(
            "PUT",
            &path,
            Some(json!({ "userId": ADVISOR, "notes": "follow up next week" })),
        )
        .await;
    assert_eq!(advisor.status, StatusCode::NO_CONTENT);
}
