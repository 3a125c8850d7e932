//! Delivery and read receipt tracking.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use consulthub_core::types::UserId;

use crate::message::types::MessageRef;

/// Delivery state of a tracked message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatus {
    /// Whether the recipient received it.
    pub delivered: bool,
    /// When it was delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    /// Whether the recipient read it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    /// When it was read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct TrackedMessage {
    sender_id: UserId,
    receiver_id: UserId,
    tracked_at: DateTime<Utc>,
    status: DeliveryStatus,
}

/// Tracks who sent what to whom and whether it arrived.
#[derive(Debug, Default)]
pub struct DeliveryTracker {
    records: DashMap<MessageRef, TrackedMessage>,
}

impl DeliveryTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a message as undelivered.
    pub fn track(&self, message_id: MessageRef, sender_id: UserId, receiver_id: UserId) {
        self.records.insert(
            message_id,
            TrackedMessage {
                sender_id,
                receiver_id,
                tracked_at: Utc::now(),
                status: DeliveryStatus::default(),
            },
        );
    }

    /// Marks a message delivered. Returns its sender if tracked.
    pub fn mark_delivered(&self, message_id: &MessageRef, at: DateTime<Utc>) -> Option<UserId> {
        let mut record = self.records.get_mut(message_id)?;
        record.status.delivered = true;
        record.status.delivered_at = Some(at);
        Some(record.sender_id)
    }

    /// Marks a message read (and therefore delivered).
    pub fn mark_read(&self, message_id: &MessageRef, at: DateTime<Utc>) -> bool {
        match self.records.get_mut(message_id) {
            Some(mut record) => {
                if !record.status.delivered {
                    record.status.delivered = true;
                    record.status.delivered_at = Some(at);
                }
                record.status.read = Some(true);
                record.status.read_at = Some(at);
                true
            }
            None => false,
        }
    }

    /// Recipient of a tracked message.
    pub fn recipient(&self, message_id: &MessageRef) -> Option<UserId> {
        self.records.get(message_id).map(|r| r.receiver_id)
    }

    /// Current status; untracked messages report undelivered.
    pub fn status(&self, message_id: &MessageRef) -> DeliveryStatus {
        self.records
            .get(message_id)
            .map(|r| r.status.clone())
            .unwrap_or_default()
    }

    /// Drops records whose delivery (or, if undelivered, tracking) time is
    /// older than `retention` as of `now`. Returns how many were removed.
    pub fn cleanup(&self, retention: Duration, now: DateTime<Utc>) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let cutoff = now - retention;
        let before = self.records.len();
        self.records
            .retain(|_, r| r.status.delivered_at.unwrap_or(r.tracked_at) >= cutoff);
        before - self.records.len()
    }

    /// Number of tracked messages.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consulthub_core::types::MessageId;

    #[test]
    fn test_delivery_then_read() {
        let tracker = DeliveryTracker::new();
        let id = MessageRef::Stored(MessageId::new(1));
        tracker.track(id.clone(), UserId::new(1), UserId::new(2));
        assert!(!tracker.status(&id).delivered);

        let now = Utc::now();
        assert_eq!(tracker.mark_delivered(&id, now), Some(UserId::new(1)));
        assert!(tracker.mark_read(&id, now));

        let status = tracker.status(&id);
        assert!(status.delivered);
        assert_eq!(status.read, Some(true));
        assert_eq!(tracker.recipient(&id), Some(UserId::new(2)));
    }

    #[test]
    fn test_unknown_message_reports_undelivered() {
        let tracker = DeliveryTracker::new();
        let id = MessageRef::temporary();
        assert_eq!(tracker.mark_delivered(&id, Utc::now()), None);
        assert_eq!(tracker.status(&id), DeliveryStatus::default());
    }

    #[test]
    fn test_cleanup_respects_retention() {
        let tracker = DeliveryTracker::new();
        let old = MessageRef::Stored(MessageId::new(1));
        let fresh = MessageRef::Stored(MessageId::new(2));
        tracker.track(old.clone(), UserId::new(1), UserId::new(2));
        tracker.track(fresh.clone(), UserId::new(1), UserId::new(2));

        let now = Utc::now();
        tracker.mark_delivered(&old, now - chrono::Duration::hours(25));
        tracker.mark_delivered(&fresh, now - chrono::Duration::hours(1));

        let removed = tracker.cleanup(Duration::from_secs(24 * 3600), now);
        assert_eq!(removed, 1);
        assert!(tracker.status(&fresh).delivered);
        assert!(!tracker.status(&old).delivered);
    }
}
