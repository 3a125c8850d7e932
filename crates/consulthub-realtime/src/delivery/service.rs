//! Message delivery service: persist, push or queue, and receipts.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use consulthub_core::config::MessagingConfig;
use consulthub_core::error::AppError;
use consulthub_core::result::AppResult;
use consulthub_core::types::{MessageId, SessionId, UserId};
use consulthub_entity::message::NewMessage;
use consulthub_storage::MessageStore;

use crate::connection::registry::ConnectionRegistry;
use crate::message::builder::{build_delivered, build_read};
use crate::message::types::{ChatMessageKind, ChatMessagePayload, Envelope, MessageRef, MessageType};
use crate::message::validator::validate_content;
use crate::metrics::RealtimeMetrics;

use super::queue::{OfflineQueue, Placement};
use super::receipts::{DeliveryStatus, DeliveryTracker};
use super::typing::TypingTracker;

/// A chat message to deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// Author.
    pub sender_id: UserId,
    /// Recipient.
    pub receiver_id: UserId,
    /// Text content.
    pub content: String,
    /// Message kind.
    #[serde(default)]
    pub message_type: ChatMessageKind,
}

/// Outcome of [`MessageDeliveryService::send`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    /// `false` only when the message was rejected.
    pub success: bool,
    /// Pushed to an online recipient.
    pub delivered: bool,
    /// Held for an offline recipient.
    pub queued: bool,
    /// Stored by the persistence collaborator.
    pub persisted: bool,
    /// Storage id, or a temporary id if persistence failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageRef>,
    /// Rejection reason, or the persistence error of a degraded send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the message was accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DeliveryResult {
    fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Running delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    /// Messages accepted.
    pub total_messages_sent: u64,
    /// Messages that reached their recipient (directly or on reconnect).
    pub total_messages_delivered: u64,
    /// Messages currently held in offline queues.
    pub total_messages_queued: u64,
    /// `delivered / sent` as a percentage (100 before anything is sent).
    pub delivery_success_rate: f64,
}

/// Delivers chat messages to online recipients, queues them for offline
/// ones, and relays typing indicators and receipts.
///
/// Storage failures never block delivery: the message goes out under a
/// temporary id and the error is surfaced in the result.
pub struct MessageDeliveryService {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn MessageStore>,
    queue: OfflineQueue,
    tracker: DeliveryTracker,
    typing: Arc<TypingTracker>,
    metrics: Arc<RealtimeMetrics>,
    max_message_length: usize,
    retention: Duration,
}

impl std::fmt::Debug for MessageDeliveryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDeliveryService")
            .field("queue_sizes", &self.queue.sizes())
            .field("tracked", &self.tracker.len())
            .finish()
    }
}

impl MessageDeliveryService {
    /// Creates a delivery service.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn MessageStore>,
        metrics: Arc<RealtimeMetrics>,
        config: &MessagingConfig,
    ) -> Self {
        let typing = Arc::new(TypingTracker::new(
            registry.clone(),
            config.typing_timeout(),
        ));
        Self {
            registry,
            store,
            queue: OfflineQueue::new(config.offline_queue_capacity),
            tracker: DeliveryTracker::new(),
            typing,
            metrics,
            max_message_length: config.max_message_length,
            retention: config.tracking_retention(),
        }
    }

    /// The typing indicator tracker.
    pub fn typing(&self) -> &Arc<TypingTracker> {
        &self.typing
    }

    /// Validates, persists and delivers (or queues) a chat message.
    pub async fn send(&self, message: OutgoingMessage) -> DeliveryResult {
        if let Err(e) = self.validate(&message) {
            warn!(
                sender_id = %message.sender_id,
                receiver_id = %message.receiver_id,
                error = %e.message,
                "Chat message rejected"
            );
            return DeliveryResult::rejected(e.message);
        }

        let new_message = NewMessage {
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
        };
        let (message_id, timestamp, persistence_error) =
            match self.store.send_message(&new_message).await {
                Ok(stored) => (MessageRef::Stored(stored.id), stored.timestamp, None),
                Err(e) => {
                    error!(
                        sender_id = %message.sender_id,
                        error = %e,
                        "Message persistence failed, delivering anyway"
                    );
                    (MessageRef::temporary(), Utc::now(), Some(e.message))
                }
            };

        self.metrics.message_sent();
        self.tracker
            .track(message_id.clone(), message.sender_id, message.receiver_id);

        let envelope = Envelope::new(
            MessageType::ChatMessage,
            &ChatMessagePayload {
                message_id: message_id.clone(),
                session_id: message.session_id,
                content: message.content,
                message_type: message.message_type,
            },
        )
        .from_user(message.sender_id)
        .at(timestamp);

        let mut result = DeliveryResult {
            success: true,
            persisted: persistence_error.is_none(),
            message_id: Some(message_id.clone()),
            error: persistence_error,
            timestamp: Some(timestamp),
            ..DeliveryResult::default()
        };

        let receiver_id = message.receiver_id;
        let placement = self.queue.deliver_or_push(receiver_id, envelope, |envelope| {
            self.registry.is_online(receiver_id) && self.registry.send(receiver_id, envelope)
        });

        match placement {
            Placement::Delivered => {
                self.metrics.message_delivered();
                self.tracker.mark_delivered(&message_id, Utc::now());
                debug!(message_id = %message_id, receiver_id = %receiver_id, "Message delivered");
                result.delivered = true;
            }
            Placement::Queued { evicted } => {
                self.metrics.message_queued();
                if evicted {
                    self.metrics.queue_evicted();
                    warn!(user_id = %receiver_id, "Offline queue full, oldest message dropped");
                }
                debug!(
                    user_id = %receiver_id,
                    size = self.queue.len(receiver_id),
                    "Message queued for offline user"
                );
                result.queued = true;
            }
        }
        result
    }

    fn validate(&self, message: &OutgoingMessage) -> AppResult<()> {
        if !message.session_id.is_valid() {
            return Err(AppError::validation("Invalid message data"));
        }
        if !message.sender_id.is_valid() {
            return Err(AppError::validation("Invalid sender ID"));
        }
        if !message.receiver_id.is_valid() {
            return Err(AppError::validation("Invalid receiver ID"));
        }
        validate_content(&message.content, self.max_message_length)
    }

    /// Flushes a reconnected user's queue in timestamp order.
    ///
    /// Returns how many envelopes were delivered. If the transport fails
    /// midway the remainder stays queued, ahead of anything sent later.
    pub fn deliver_queued(&self, user_id: UserId) -> usize {
        let delivered = self
            .queue
            .flush(user_id, |envelope| self.registry.send(user_id, envelope));
        if delivered.is_empty() {
            return 0;
        }

        let now = Utc::now();
        for envelope in &delivered {
            if let Ok(payload) = envelope.payload_as::<ChatMessagePayload>() {
                self.tracker.mark_delivered(&payload.message_id, now);
            }
            self.metrics.message_delivered();
        }

        let count = delivered.len();
        self.metrics.message_dequeued(count as u64);
        info!(
            user_id = %user_id,
            delivered = count,
            remaining = self.queue.len(user_id),
            "Queued messages flushed"
        );
        count
    }

    /// Records a typing change and notifies the other session members.
    pub fn set_typing(&self, session_id: SessionId, user_id: UserId, is_typing: bool) {
        self.typing.set_typing(session_id, user_id, is_typing);
    }

    /// Records a delivery confirmation from the recipient and notifies the
    /// author. Returns `false` if the message is not tracked or `user_id`
    /// is not its recipient.
    pub fn confirm_delivery(&self, message_id: &MessageRef, user_id: UserId) -> bool {
        if self.tracker.recipient(message_id) != Some(user_id) {
            debug!(message_id = %message_id, user_id = %user_id, "Ignoring delivery confirmation");
            return false;
        }
        let Some(sender_id) = self.tracker.mark_delivered(message_id, Utc::now()) else {
            return false;
        };
        self.registry.send(sender_id, &build_delivered(message_id.clone()));
        true
    }

    /// Marks a message read in storage and, if the store confirms, sends a
    /// read receipt to the author.
    pub async fn mark_read(
        &self,
        message_id: MessageId,
        user_id: UserId,
        sender_id: UserId,
    ) -> AppResult<bool> {
        if !self.store.mark_as_read(message_id, user_id).await? {
            debug!(message_id = %message_id, user_id = %user_id, "Read receipt not applied");
            return Ok(false);
        }

        self.tracker
            .mark_read(&MessageRef::Stored(message_id), Utc::now());
        self.registry.send(sender_id, &build_read(message_id, user_id));
        debug!(message_id = %message_id, read_by = %user_id, "Message marked read");
        Ok(true)
    }

    /// Starts tracking a message for delivery confirmation.
    pub fn track(&self, message_id: MessageRef, sender_id: UserId, receiver_id: UserId) {
        self.tracker.track(message_id, sender_id, receiver_id);
    }

    /// Delivery status of a message.
    pub fn delivery_status(&self, message_id: &MessageRef) -> DeliveryStatus {
        self.tracker.status(message_id)
    }

    /// Envelopes waiting for a user, in insertion order.
    pub fn queued_messages(&self, user_id: UserId) -> Vec<Envelope> {
        self.queue.snapshot(user_id)
    }

    /// Queue length per user.
    pub fn queue_sizes(&self) -> BTreeMap<UserId, usize> {
        self.queue.sizes()
    }

    /// Drops a user's queue. Returns how many envelopes were removed.
    pub fn clear_queue(&self, user_id: UserId) -> usize {
        let removed = self.queue.clear(user_id);
        self.metrics.message_dequeued(removed as u64);
        info!(user_id = %user_id, removed, "Message queue cleared");
        removed
    }

    /// Drops delivery records older than `older_than`.
    pub fn cleanup_tracking(&self, older_than: Duration) -> usize {
        let removed = self.tracker.cleanup(older_than, Utc::now());
        if removed > 0 {
            debug!(removed, "Delivery tracking cleaned up");
        }
        removed
    }

    /// Drops delivery records older than the configured retention.
    pub fn cleanup_expired_tracking(&self) -> usize {
        self.cleanup_tracking(self.retention)
    }

    /// Running delivery statistics.
    pub fn stats(&self) -> DeliveryStats {
        let snapshot = self.metrics.snapshot();
        let delivery_success_rate = if snapshot.messages_sent > 0 {
            snapshot.messages_delivered as f64 / snapshot.messages_sent as f64 * 100.0
        } else {
            100.0
        };
        DeliveryStats {
            total_messages_sent: snapshot.messages_sent,
            total_messages_delivered: snapshot.messages_delivered,
            total_messages_queued: snapshot.messages_queued,
            delivery_success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::handle::OutboundFrame;
    use async_trait::async_trait;
    use consulthub_entity::message::{Message, MessageSearch};
    use consulthub_storage::MemoryMessageStore;
    use serde_json::Value;
    use tokio::sync::mpsc;

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl MessageStore for FailingStore {
        async fn send_message(&self, _message: &NewMessage) -> AppResult<Message> {
            Err(AppError::database("connection refused"))
        }
        async fn get_conversation(&self, _a: UserId, _b: UserId) -> AppResult<Vec<Message>> {
            Ok(Vec::new())
        }
        async fn mark_as_read(&self, _id: MessageId, _user: UserId) -> AppResult<bool> {
            Err(AppError::database("connection refused"))
        }
        async fn search(&self, _query: &MessageSearch) -> AppResult<Vec<Message>> {
            Ok(Vec::new())
        }
    }

    fn service_with(store: Arc<dyn MessageStore>) -> (Arc<ConnectionRegistry>, MessageDeliveryService) {
        let metrics = Arc::new(RealtimeMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(256, metrics.clone()));
        let service = MessageDeliveryService::new(
            registry.clone(),
            store,
            metrics,
            &MessagingConfig::default(),
        );
        (registry, service)
    }

    fn message(content: &str) -> OutgoingMessage {
        OutgoingMessage {
            session_id: SessionId::new(1),
            sender_id: UserId::new(1),
            receiver_id: UserId::new(2),
            content: content.to_string(),
            message_type: ChatMessageKind::Text,
        }
    }

    fn frames(rx: &mut mpsc::Receiver<OutboundFrame>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let OutboundFrame::Text(text) = frame {
                out.push(serde_json::from_str(&text).unwrap());
            }
        }
        out
    }

    #[tokio::test]
    async fn test_online_recipient_gets_message_immediately() {
        let (registry, service) = service_with(Arc::new(MemoryMessageStore::new()));
        let (_h, mut rx) = registry.connect(UserId::new(2));

        let result = service.send(message("hello")).await;
        assert!(result.success && result.delivered && result.persisted);
        assert!(!result.queued);
        assert_eq!(result.message_id, Some(MessageRef::Stored(MessageId::new(1))));

        let received = frames(&mut rx);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["type"], "chat_message");
        assert_eq!(received[0]["payload"]["content"], "hello");
        assert_eq!(received[0]["from"], 1);
    }

    #[tokio::test]
    async fn test_offline_recipient_is_queued_and_flushed_in_order() {
        let (registry, service) = service_with(Arc::new(MemoryMessageStore::new()));

        for text in ["first", "second", "third"] {
            let result = service.send(message(text)).await;
            assert!(result.queued);
        }
        assert_eq!(service.queue_sizes().get(&UserId::new(2)), Some(&3));

        let (_h, mut rx) = registry.connect(UserId::new(2));
        assert_eq!(service.deliver_queued(UserId::new(2)), 3);

        let received = frames(&mut rx);
        let contents: Vec<_> = received
            .iter()
            .map(|v| v["payload"]["content"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert!(service.queued_messages(UserId::new(2)).is_empty());

        let stats = service.stats();
        assert_eq!(stats.total_messages_sent, 3);
        assert_eq!(stats.total_messages_delivered, 3);
        assert_eq!(stats.total_messages_queued, 0);
        assert_eq!(stats.delivery_success_rate, 100.0);
    }

    #[tokio::test]
    async fn test_send_after_reconnect_waits_for_older_queued_messages() {
        let (registry, service) = service_with(Arc::new(MemoryMessageStore::new()));
        assert!(service.send(message("old")).await.queued);

        let (_h, mut rx) = registry.connect(UserId::new(2));
        let result = service.send(message("new")).await;
        assert!(result.queued);
        assert!(!result.delivered);
        assert!(frames(&mut rx).is_empty());

        assert_eq!(service.deliver_queued(UserId::new(2)), 2);
        let contents: Vec<_> = frames(&mut rx)
            .iter()
            .map(|v| v["payload"]["content"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(contents, vec!["old", "new"]);

        assert!(service.send(message("live")).await.delivered);
    }

    #[tokio::test]
    async fn test_queue_is_capped_at_capacity() {
        let (_registry, service) = service_with(Arc::new(MemoryMessageStore::new()));
        for i in 0..101 {
            service.send(message(&format!("msg {i}"))).await;
        }

        let queued = service.queued_messages(UserId::new(2));
        assert_eq!(queued.len(), 100);
        assert_eq!(queued[0].payload["content"], "msg 1");
        assert_eq!(service.stats().total_messages_queued, 100);
    }

    #[tokio::test]
    async fn test_storage_outage_degrades_to_temporary_id() {
        let (registry, service) = service_with(Arc::new(FailingStore));
        let (_h, _rx) = registry.connect(UserId::new(2));

        let result = service.send(message("still works")).await;
        assert!(result.success);
        assert!(result.delivered);
        assert!(!result.persisted);
        assert!(matches!(result.message_id, Some(MessageRef::Temporary(_))));
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_invalid_messages_are_rejected() {
        let (_registry, service) = service_with(Arc::new(MemoryMessageStore::new()));

        let empty = service.send(message("   ")).await;
        assert!(!empty.success);
        assert_eq!(empty.error.as_deref(), Some("Message content cannot be empty"));

        let mut bad_sender = message("hi");
        bad_sender.sender_id = UserId::new(0);
        assert_eq!(
            service.send(bad_sender).await.error.as_deref(),
            Some("Invalid sender ID")
        );

        let too_long = service.send(message(&"a".repeat(10_001))).await;
        assert!(!too_long.success);
        assert_eq!(service.stats().total_messages_sent, 0);
    }

    #[tokio::test]
    async fn test_delivery_confirmation_notifies_author() {
        let (registry, service) = service_with(Arc::new(MemoryMessageStore::new()));
        let (_h1, mut author) = registry.connect(UserId::new(1));

        let id = service.send(message("ping")).await.message_id.unwrap();
        assert!(!service.confirm_delivery(&id, UserId::new(3)));
        assert!(service.confirm_delivery(&id, UserId::new(2)));
        assert!(service.delivery_status(&id).delivered);

        let received = frames(&mut author);
        assert_eq!(received.last().unwrap()["type"], "message_delivered");
    }

    #[tokio::test]
    async fn test_read_receipt_requires_store_confirmation() {
        let store = Arc::new(MemoryMessageStore::new());
        let (registry, service) = service_with(store);
        let (_h1, mut author) = registry.connect(UserId::new(1));

        let id = service.send(message("read me")).await.message_id.unwrap();
        let stored = id.stored().unwrap();

        assert!(!service.mark_read(stored, UserId::new(9), UserId::new(1)).await.unwrap());
        assert!(frames(&mut author).is_empty());

        assert!(service.mark_read(stored, UserId::new(2), UserId::new(1)).await.unwrap());
        let received = frames(&mut author);
        assert_eq!(received[0]["type"], "message_read");
        assert_eq!(received[0]["payload"]["readBy"], 2);
        assert_eq!(service.delivery_status(&id).read, Some(true));
    }

    #[tokio::test]
    async fn test_clear_queue_reports_removed() {
        let (_registry, service) = service_with(Arc::new(MemoryMessageStore::new()));
        service.send(message("a")).await;
        service.send(message("b")).await;

        assert_eq!(service.clear_queue(UserId::new(2)), 2);
        assert_eq!(service.stats().total_messages_queued, 0);
    }
}
