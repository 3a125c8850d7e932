//! # consulthub-realtime
//!
//! Real-time transport layer for ConsultHub. Provides:
//!
//! - A connection registry with heartbeat liveness and per-session membership
//! - Call signaling relay (offer/answer/ICE candidate/end) between two peers
//! - Chat delivery with a bounded offline queue, typing indicators and receipts
//! - An inbound frame router and engine wiring with background sweepers

pub mod connection;
pub mod delivery;
pub mod message;
pub mod metrics;
pub mod router;
pub mod server;
pub mod signaling;

pub use connection::registry::{ConnectionRegistry, RegistryEvent};
pub use delivery::service::MessageDeliveryService;
pub use message::types::{Envelope, MessageType};
pub use router::InboundRouter;
pub use server::RealtimeEngine;
pub use signaling::relay::SignalingRelay;
