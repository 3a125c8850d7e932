//! Persisted chat message and search query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use consulthub_core::types::{MessageId, UserId};

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Storage-assigned identifier.
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Recipient.
    pub receiver_id: UserId,
    /// Text content.
    pub content: String,
    /// When the message was stored.
    pub timestamp: DateTime<Utc>,
    /// Whether the recipient has read it.
    pub read: bool,
}

/// Data required to store a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    /// Author.
    pub sender_id: UserId,
    /// Recipient.
    pub receiver_id: UserId,
    /// Text content.
    pub content: String,
}

/// Message search filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSearch {
    /// Only messages sent or received by this user.
    pub user_id: UserId,
    /// Case-insensitive substring of the content.
    pub query: Option<String>,
    /// Inclusive lower bound on the timestamp.
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the timestamp.
    pub end_date: Option<DateTime<Utc>>,
    /// Maximum results.
    pub limit: Option<usize>,
    /// Results to skip.
    pub offset: Option<usize>,
}
