//! Envelope and payload type definitions.
//!
//! Every frame exchanged over a connection is an [`Envelope`]:
//! `{type, payload, from?, timestamp?}` with camelCase payload fields.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use consulthub_core::types::{MessageId, SessionId, UserId};
use consulthub_entity::session::SessionStatus;

/// Recognized envelope `type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Liveness probe.
    Ping,
    /// Liveness reply.
    Pong,
    /// A user came online.
    UserOnline,
    /// A user went offline.
    UserOffline,
    /// Call offer.
    SignalOffer,
    /// Call answer.
    SignalAnswer,
    /// ICE candidate.
    SignalIceCandidate,
    /// Call hang-up.
    SignalEnd,
    /// Chat message.
    ChatMessage,
    /// Typing started/stopped.
    TypingIndicator,
    /// Delivery receipt.
    MessageDelivered,
    /// Read receipt.
    MessageRead,
    /// Session started.
    SessionStart,
    /// Session ended.
    SessionEnd,
    /// Session status changed.
    SessionUpdate,
    /// A participant joined.
    SessionJoin,
    /// A participant left.
    SessionLeave,
    /// Error report.
    Error,
}

impl MessageType {
    /// Returns `true` for the four call-signaling kinds.
    pub fn is_signaling(self) -> bool {
        matches!(
            self,
            Self::SignalOffer | Self::SignalAnswer | Self::SignalIceCandidate | Self::SignalEnd
        )
    }
}

/// A real-time message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Kind-specific payload.
    #[serde(default)]
    pub payload: Value,
    /// Originating user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
    /// When the envelope was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Envelope {
    /// Build an envelope from a serializable payload, stamped with the
    /// current time.
    pub fn new<P: Serialize>(kind: MessageType, payload: &P) -> Self {
        Self {
            kind,
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
            from: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Set the originating user.
    pub fn from_user(mut self, user_id: UserId) -> Self {
        self.from = Some(user_id);
        self
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Decode the payload into a typed struct.
    pub fn payload_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.payload.clone())
    }
}

/// An SDP session description (`{type, sdp}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// `offer` or `answer`.
    #[serde(rename = "type")]
    pub kind: String,
    /// SDP body.
    pub sdp: String,
}

/// Media kind of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    /// Voice only.
    Audio,
    /// Voice and video.
    Video,
}

/// `signal_offer` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalOffer {
    /// Session the call belongs to.
    pub session_id: SessionId,
    /// Caller's offer.
    pub offer: SessionDescription,
    /// Requested media.
    pub call_type: CallType,
}

/// `signal_answer` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalAnswer {
    /// Session the call belongs to.
    pub session_id: SessionId,
    /// Callee's answer.
    pub answer: SessionDescription,
}

/// An ICE candidate. Fields other than `candidate` are passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidate {
    /// Candidate line.
    pub candidate: String,
    /// `sdpMid`, `sdpMLineIndex`, `usernameFragment`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `signal_ice_candidate` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalIceCandidate {
    /// Session the call belongs to.
    pub session_id: SessionId,
    /// The candidate.
    pub candidate: IceCandidate,
}

/// `signal_end` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnd {
    /// Session the call belongs to.
    pub session_id: SessionId,
    /// Optional hang-up reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Whether a chat message was typed by a participant or generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageKind {
    /// Typed by a participant.
    #[default]
    Text,
    /// Generated by the platform.
    System,
}

/// Identifier of a chat message for receipts.
///
/// Persisted messages carry their storage id; messages sent while storage
/// was unavailable carry a temporary string id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageRef {
    /// Storage-assigned id.
    Stored(MessageId),
    /// Temporary id (`temp-<uuid>`).
    Temporary(String),
}

impl MessageRef {
    /// Create a fresh temporary id.
    pub fn temporary() -> Self {
        Self::Temporary(format!("temp-{}", uuid::Uuid::new_v4()))
    }

    /// The storage id, if the message was persisted.
    pub fn stored(&self) -> Option<MessageId> {
        match self {
            Self::Stored(id) => Some(*id),
            Self::Temporary(_) => None,
        }
    }
}

impl std::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored(id) => write!(f, "{id}"),
            Self::Temporary(id) => f.write_str(id),
        }
    }
}

/// `chat_message` payload as sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRequest {
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// Recipient.
    pub receiver_id: UserId,
    /// Text content.
    pub content: String,
    /// Message kind.
    #[serde(default)]
    pub message_type: ChatMessageKind,
}

/// `chat_message` payload as delivered to a recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    /// Message id for receipts.
    pub message_id: MessageRef,
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// Text content.
    pub content: String,
    /// Message kind.
    pub message_type: ChatMessageKind,
}

/// `typing_indicator` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Session the typist belongs to.
    pub session_id: SessionId,
    /// Started (`true`) or stopped (`false`).
    pub is_typing: bool,
}

/// `message_delivered` payload, in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredPayload {
    /// Delivered message.
    pub message_id: MessageRef,
    /// Set on the notification sent to the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

/// `message_read` payload as sent by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    /// Message that was read.
    pub message_id: MessageId,
    /// Its author, who receives the receipt.
    pub sender_id: UserId,
}

/// `message_read` payload as delivered to the author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadPayload {
    /// Message that was read.
    pub message_id: MessageId,
    /// Reader.
    pub read_by: UserId,
    /// When it was read.
    pub read_at: DateTime<Utc>,
}

/// `session_update` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdatePayload {
    /// Session.
    pub session_id: SessionId,
    /// New status.
    pub status: SessionStatus,
    /// Current participants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<UserId>>,
    /// Billed minutes so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

/// `error` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}
