//! Builder helpers for constructing outbound envelopes.

use chrono::Utc;

use consulthub_core::types::{MessageId, SessionId, UserId};
use consulthub_entity::session::SessionStatus;

use super::types::{
    DeliveredPayload, Envelope, ErrorPayload, MessageRef, MessageType, ReadPayload,
    SessionUpdatePayload, TypingPayload,
};

/// Build an error envelope.
pub fn build_error(code: &str, message: &str) -> Envelope {
    Envelope::new(
        MessageType::Error,
        &ErrorPayload {
            code: code.to_string(),
            message: message.to_string(),
        },
    )
}

/// Build a server liveness probe.
pub fn build_ping() -> Envelope {
    Envelope::new(MessageType::Ping, &serde_json::json!({}))
}

/// Build a typing indicator on behalf of `user_id`.
pub fn build_typing(session_id: SessionId, user_id: UserId, is_typing: bool) -> Envelope {
    Envelope::new(
        MessageType::TypingIndicator,
        &TypingPayload {
            session_id,
            is_typing,
        },
    )
    .from_user(user_id)
}

/// Build the delivery confirmation sent to a message's author.
pub fn build_delivered(message_id: MessageRef) -> Envelope {
    Envelope::new(
        MessageType::MessageDelivered,
        &DeliveredPayload {
            message_id,
            delivered_at: Some(Utc::now()),
        },
    )
}

/// Build the read receipt sent to a message's author.
pub fn build_read(message_id: MessageId, read_by: UserId) -> Envelope {
    Envelope::new(
        MessageType::MessageRead,
        &ReadPayload {
            message_id,
            read_by,
            read_at: Utc::now(),
        },
    )
}

/// Build a session status broadcast.
pub fn build_session_update(
    session_id: SessionId,
    status: SessionStatus,
    participants: Vec<UserId>,
    duration: Option<i64>,
) -> Envelope {
    Envelope::new(
        MessageType::SessionUpdate,
        &SessionUpdatePayload {
            session_id,
            status,
            participants: Some(participants),
            duration,
        },
    )
}

/// Build a participant join/leave notification.
pub fn build_membership(kind: MessageType, session_id: SessionId, user_id: UserId) -> Envelope {
    Envelope::new(
        kind,
        &serde_json::json!({ "sessionId": session_id, "userId": user_id }),
    )
    .from_user(user_id)
}
