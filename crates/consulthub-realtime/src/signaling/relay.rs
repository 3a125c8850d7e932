//! Signaling relay: forwards offer/answer/ICE candidates to the peer and
//! hang-ups to everyone else in the session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use consulthub_core::types::{SessionId, UserId};

use crate::connection::registry::ConnectionRegistry;
use crate::message::types::{
    Envelope, MessageType, SignalAnswer, SignalEnd, SignalIceCandidate, SignalOffer,
};
use crate::metrics::RealtimeMetrics;

/// A validated signaling message.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalMessage {
    /// Call offer.
    Offer(SignalOffer),
    /// Call answer.
    Answer(SignalAnswer),
    /// ICE candidate.
    IceCandidate(SignalIceCandidate),
    /// Hang-up.
    End(SignalEnd),
}

impl SignalMessage {
    /// Session the message belongs to.
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Offer(p) => p.session_id,
            Self::Answer(p) => p.session_id,
            Self::IceCandidate(p) => p.session_id,
            Self::End(p) => p.session_id,
        }
    }

    /// Envelope type of the message.
    pub fn kind(&self) -> MessageType {
        match self {
            Self::Offer(_) => MessageType::SignalOffer,
            Self::Answer(_) => MessageType::SignalAnswer,
            Self::IceCandidate(_) => MessageType::SignalIceCandidate,
            Self::End(_) => MessageType::SignalEnd,
        }
    }
}

/// Who is reachable for signaling in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSignalStats {
    /// Session.
    pub session_id: SessionId,
    /// Number of connected members.
    pub participant_count: usize,
    /// Connected members.
    pub participants: Vec<UserId>,
    /// Whether anyone is connected.
    pub is_active: bool,
}

/// Routes call-setup messages between session participants.
///
/// Messages are forwarded in receipt order and never retried: if the peer is
/// not connected the message is logged and dropped.
#[derive(Debug)]
pub struct SignalingRelay {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<RealtimeMetrics>,
}

impl SignalingRelay {
    /// Creates a relay over the given registry.
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Arc<RealtimeMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Validates a raw signaling frame.
    ///
    /// Accepts only the four signaling types with a numeric `sessionId` and
    /// a well-formed type-specific payload; returns `None` otherwise.
    pub fn validate(raw: &Value) -> Option<SignalMessage> {
        let kind: MessageType = serde_json::from_value(raw.get("type")?.clone()).ok()?;
        let payload = raw.get("payload")?;
        if !payload.is_object() || !payload.get("sessionId")?.is_i64() {
            return None;
        }

        match kind {
            MessageType::SignalOffer => {
                let offer: SignalOffer = serde_json::from_value(payload.clone()).ok()?;
                (offer.offer.kind == "offer").then_some(SignalMessage::Offer(offer))
            }
            MessageType::SignalAnswer => {
                let answer: SignalAnswer = serde_json::from_value(payload.clone()).ok()?;
                (answer.answer.kind == "answer").then_some(SignalMessage::Answer(answer))
            }
            MessageType::SignalIceCandidate => serde_json::from_value(payload.clone())
                .ok()
                .map(SignalMessage::IceCandidate),
            MessageType::SignalEnd => serde_json::from_value(payload.clone())
                .ok()
                .map(SignalMessage::End),
            _ => None,
        }
    }

    /// Routes a validated message. Returns how many users received it.
    pub fn route(&self, from: UserId, message: SignalMessage) -> usize {
        match message {
            SignalMessage::Offer(payload) => usize::from(self.route_offer(from, &payload).is_some()),
            SignalMessage::Answer(payload) => {
                usize::from(self.route_answer(from, &payload).is_some())
            }
            SignalMessage::IceCandidate(payload) => {
                usize::from(self.route_ice_candidate(from, &payload).is_some())
            }
            SignalMessage::End(payload) => self.route_end(from, &payload),
        }
    }

    /// Forwards an offer to the other participant.
    pub fn route_offer(&self, from: UserId, payload: &SignalOffer) -> Option<UserId> {
        self.forward_to_peer(MessageType::SignalOffer, from, payload.session_id, payload)
    }

    /// Forwards an answer to the other participant.
    pub fn route_answer(&self, from: UserId, payload: &SignalAnswer) -> Option<UserId> {
        self.forward_to_peer(MessageType::SignalAnswer, from, payload.session_id, payload)
    }

    /// Forwards an ICE candidate to the other participant.
    pub fn route_ice_candidate(&self, from: UserId, payload: &SignalIceCandidate) -> Option<UserId> {
        self.forward_to_peer(
            MessageType::SignalIceCandidate,
            from,
            payload.session_id,
            payload,
        )
    }

    /// Notifies every other participant that the call ended.
    pub fn route_end(&self, from: UserId, payload: &SignalEnd) -> usize {
        let envelope = Envelope::new(MessageType::SignalEnd, payload).from_user(from);
        let notified = self
            .registry
            .users_in_session(payload.session_id)
            .into_iter()
            .filter(|user_id| *user_id != from)
            .filter(|user_id| self.registry.send(*user_id, &envelope))
            .count();

        info!(
            session_id = %payload.session_id,
            from = %from,
            reason = payload.reason.as_deref().unwrap_or("none"),
            notified,
            "Call ended"
        );
        notified
    }

    /// Connected members of a session.
    pub fn session_stats(&self, session_id: SessionId) -> SessionSignalStats {
        let participants = self.registry.users_in_session(session_id);
        SessionSignalStats {
            session_id,
            participant_count: participants.len(),
            is_active: !participants.is_empty(),
            participants,
        }
    }

    fn forward_to_peer<P: Serialize>(
        &self,
        kind: MessageType,
        from: UserId,
        session_id: SessionId,
        payload: &P,
    ) -> Option<UserId> {
        let Some(target) = self
            .registry
            .users_in_session(session_id)
            .into_iter()
            .find(|user_id| *user_id != from)
        else {
            warn!(session_id = %session_id, from = %from, kind = ?kind, "No peer for signaling message");
            self.metrics.signal_dropped();
            return None;
        };

        let envelope = Envelope::new(kind, payload).from_user(from);
        if self.registry.send(target, &envelope) {
            debug!(session_id = %session_id, from = %from, to = %target, kind = ?kind, "Signal routed");
            self.metrics.signal_routed();
            Some(target)
        } else {
            warn!(session_id = %session_id, to = %target, kind = ?kind, "Peer unreachable, signal dropped");
            self.metrics.signal_dropped();
            None
        }
    }
}
