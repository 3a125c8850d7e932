//! Chat message persistence trait.

use async_trait::async_trait;

use consulthub_core::result::AppResult;
use consulthub_core::types::{MessageId, UserId};
use consulthub_entity::message::{Message, MessageSearch, NewMessage};

/// Durable storage for chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Store a message and return it with its assigned id.
    async fn send_message(&self, message: &NewMessage) -> AppResult<Message>;

    /// All messages exchanged between two users, oldest first.
    async fn get_conversation(&self, user_a: UserId, user_b: UserId) -> AppResult<Vec<Message>>;

    /// Mark a message read by its recipient. Returns `false` if the message
    /// does not exist or `user_id` is not its recipient.
    async fn mark_as_read(&self, message_id: MessageId, user_id: UserId) -> AppResult<bool>;

    /// Search a user's messages.
    async fn search(&self, query: &MessageSearch) -> AppResult<Vec<Message>>;
}
