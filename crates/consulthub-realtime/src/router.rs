//! Inbound frame router.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use consulthub_core::types::UserId;

use crate::connection::handle::OutboundFrame;
use crate::connection::registry::ConnectionRegistry;
use crate::delivery::service::{MessageDeliveryService, OutgoingMessage};
use crate::message::builder::build_error;
use crate::message::types::{
    ChatMessageRequest, DeliveredPayload, Envelope, MessageType, ReadRequest, TypingPayload,
};
use crate::message::validator::validate_frame;
use crate::metrics::RealtimeMetrics;
use crate::signaling::relay::SignalingRelay;

/// Dispatches text frames from a connection to the owning component.
#[derive(Debug)]
pub struct InboundRouter {
    registry: Arc<ConnectionRegistry>,
    relay: Arc<SignalingRelay>,
    delivery: Arc<MessageDeliveryService>,
    metrics: Arc<RealtimeMetrics>,
    max_frame_size: usize,
}

impl InboundRouter {
    /// Creates a router.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        relay: Arc<SignalingRelay>,
        delivery: Arc<MessageDeliveryService>,
        metrics: Arc<RealtimeMetrics>,
        max_frame_size: usize,
    ) -> Self {
        Self {
            registry,
            relay,
            delivery,
            metrics,
            max_frame_size,
        }
    }

    /// Handles one text frame from `user_id`.
    ///
    /// Malformed or unsupported frames are answered with an `error`
    /// envelope; they never close the connection.
    pub async fn handle_text(&self, user_id: UserId, raw: &str) {
        self.metrics.frame_received();

        if raw == "ping" {
            self.registry.record_heartbeat(user_id);
            self.registry
                .send_frame(user_id, OutboundFrame::Text("pong".to_string()));
            return;
        }

        if let Err(e) = validate_frame(raw, self.max_frame_size) {
            self.reply_error(user_id, "INVALID_MESSAGE", &e.message);
            return;
        }

        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                self.reply_error(
                    user_id,
                    "INVALID_MESSAGE",
                    &format!("Failed to parse message: {e}"),
                );
                return;
            }
        };

        let kind = match value
            .get("type")
            .cloned()
            .map(serde_json::from_value::<MessageType>)
        {
            Some(Ok(kind)) => kind,
            _ => {
                self.reply_error(user_id, "UNKNOWN_TYPE", "Unrecognized message type");
                return;
            }
        };

        if kind.is_signaling() {
            self.handle_signal(user_id, &value);
            return;
        }

        let envelope: Envelope = match serde_json::from_value(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.reply_error(user_id, "INVALID_MESSAGE", &e.to_string());
                return;
            }
        };

        match kind {
            MessageType::ChatMessage => self.handle_chat(user_id, &envelope).await,
            MessageType::TypingIndicator => match envelope.payload_as::<TypingPayload>() {
                Ok(typing) => self.handle_typing(user_id, typing),
                Err(e) => self.reply_error(user_id, "INVALID_PAYLOAD", &e.to_string()),
            },
            MessageType::MessageDelivered => match envelope.payload_as::<DeliveredPayload>() {
                Ok(receipt) => {
                    self.delivery.confirm_delivery(&receipt.message_id, user_id);
                }
                Err(e) => self.reply_error(user_id, "INVALID_PAYLOAD", &e.to_string()),
            },
            MessageType::MessageRead => match envelope.payload_as::<ReadRequest>() {
                Ok(read) => {
                    if let Err(e) = self
                        .delivery
                        .mark_read(read.message_id, user_id, read.sender_id)
                        .await
                    {
                        error!(
                            message_id = %read.message_id,
                            user_id = %user_id,
                            error = %e,
                            "Failed to handle read receipt"
                        );
                    }
                }
                Err(e) => self.reply_error(user_id, "INVALID_PAYLOAD", &e.to_string()),
            },
            MessageType::Ping => {
                self.registry.record_heartbeat(user_id);
                self.registry.send(
                    user_id,
                    &Envelope::new(MessageType::Pong, &serde_json::json!({})),
                );
            }
            MessageType::Pong => {
                self.registry.record_heartbeat(user_id);
            }
            other => {
                debug!(user_id = %user_id, kind = ?other, "Unsupported inbound type");
                self.reply_error(
                    user_id,
                    "UNSUPPORTED_TYPE",
                    "Message type is not accepted from clients",
                );
            }
        }
    }

    fn handle_typing(&self, user_id: UserId, typing: TypingPayload) {
        if !self.registry.sessions_of(user_id).contains(&typing.session_id) {
            warn!(user_id = %user_id, session_id = %typing.session_id, "Typing from non-member");
            self.reply_error(user_id, "NOT_IN_SESSION", "Not a participant of this session");
            return;
        }
        self.delivery
            .set_typing(typing.session_id, user_id, typing.is_typing);
    }

    fn handle_signal(&self, user_id: UserId, value: &Value) {
        let Some(message) = SignalingRelay::validate(value) else {
            warn!(user_id = %user_id, "Invalid signaling message");
            self.reply_error(user_id, "INVALID_SIGNAL", "Invalid signaling message");
            return;
        };

        let session_id = message.session_id();
        if !self.registry.sessions_of(user_id).contains(&session_id) {
            warn!(user_id = %user_id, session_id = %session_id, "Signal from non-member");
            self.reply_error(user_id, "NOT_IN_SESSION", "Not a participant of this session");
            return;
        }

        self.relay.route(user_id, message);
    }

    async fn handle_chat(&self, user_id: UserId, envelope: &Envelope) {
        let request = match envelope.payload_as::<ChatMessageRequest>() {
            Ok(request) => request,
            Err(e) => {
                self.reply_error(user_id, "INVALID_PAYLOAD", &e.to_string());
                return;
            }
        };

        let result = self
            .delivery
            .send(OutgoingMessage {
                session_id: request.session_id,
                sender_id: user_id,
                receiver_id: request.receiver_id,
                content: request.content,
                message_type: request.message_type,
            })
            .await;

        if !result.success {
            let reason = result.error.as_deref().unwrap_or("Message rejected");
            self.reply_error(user_id, "MESSAGE_REJECTED", reason);
        }
    }

    fn reply_error(&self, user_id: UserId, code: &str, message: &str) {
        self.registry.send(user_id, &build_error(code, message));
    }
}
