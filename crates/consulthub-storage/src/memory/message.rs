//! In-memory chat message store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use consulthub_core::result::AppResult;
use consulthub_core::types::{MessageId, UserId};
use consulthub_entity::message::{Message, MessageSearch, NewMessage};

use crate::traits::MessageStore;

#[derive(Debug, Default)]
struct InnerState {
    next_id: i64,
    messages: Vec<Message>,
}

/// In-memory [`MessageStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryMessageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn send_message(&self, message: &NewMessage) -> AppResult<Message> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let stored = Message {
            id: MessageId::new(state.next_id),
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            timestamp: Utc::now(),
            read: false,
        };
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn get_conversation(&self, user_a: UserId, user_b: UserId) -> AppResult<Vec<Message>> {
        let state = self.state.lock().await;
        let mut conversation: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_a && m.receiver_id == user_b)
                    || (m.sender_id == user_b && m.receiver_id == user_a)
            })
            .cloned()
            .collect();
        conversation.sort_by_key(|m| (m.timestamp, m.id));
        Ok(conversation)
    }

    async fn mark_as_read(&self, message_id: MessageId, user_id: UserId) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && m.receiver_id == user_id)
        {
            Some(message) => {
                message.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn search(&self, query: &MessageSearch) -> AppResult<Vec<Message>> {
        let state = self.state.lock().await;
        let needle = query.query.as_ref().map(|q| q.to_lowercase());

        let results = state
            .messages
            .iter()
            .filter(|m| m.sender_id == query.user_id || m.receiver_id == query.user_id)
            .filter(|m| {
                needle
                    .as_ref()
                    .is_none_or(|n| m.content.to_lowercase().contains(n.as_str()))
            })
            .filter(|m| query.start_date.is_none_or(|start| m.timestamp >= start))
            .filter(|m| query.end_date.is_none_or(|end| m.timestamp <= end))
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_message(from: i64, to: i64, content: &str) -> NewMessage {
        NewMessage {
            sender_id: UserId::new(from),
            receiver_id: UserId::new(to),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_conversation_is_symmetric() {
        let store = MemoryMessageStore::new();
        store.send_message(&new_message(1, 2, "hello")).await.unwrap();
        store.send_message(&new_message(2, 1, "hi there")).await.unwrap();
        store.send_message(&new_message(1, 3, "elsewhere")).await.unwrap();

        let conversation = store
            .get_conversation(UserId::new(2), UserId::new(1))
            .await
            .unwrap();
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[0].content, "hello");
    }

    #[tokio::test]
    async fn test_only_recipient_can_mark_read() {
        let store = MemoryMessageStore::new();
        let stored = store.send_message(&new_message(1, 2, "hello")).await.unwrap();

        assert!(!store.mark_as_read(stored.id, UserId::new(1)).await.unwrap());
        assert!(store.mark_as_read(stored.id, UserId::new(2)).await.unwrap());
        assert!(!store.mark_as_read(MessageId::new(77), UserId::new(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_filters_and_paginates() {
        let store = MemoryMessageStore::new();
        store.send_message(&new_message(1, 2, "Tarot reading")).await.unwrap();
        store.send_message(&new_message(1, 2, "tarot follow-up")).await.unwrap();
        store.send_message(&new_message(1, 2, "astrology")).await.unwrap();

        let query = MessageSearch {
            user_id: UserId::new(2),
            query: Some("TAROT".to_string()),
            start_date: None,
            end_date: None,
            limit: Some(1),
            offset: Some(1),
        };
        let results = store.search(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "tarot follow-up");
    }
}
