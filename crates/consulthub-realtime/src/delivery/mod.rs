//! Chat delivery: online push, offline queue, typing indicators, receipts.

pub mod queue;
pub mod receipts;
pub mod service;
pub mod typing;

pub use queue::{OfflineQueue, Placement};
pub use receipts::{DeliveryStatus, DeliveryTracker};
pub use service::{DeliveryResult, DeliveryStats, MessageDeliveryService, OutgoingMessage};
pub use typing::TypingTracker;
