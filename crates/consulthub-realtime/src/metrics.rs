//! Real-time engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_total: AtomicU64,
    connections_closed: AtomicU64,
    frames_received: AtomicU64,
    envelopes_sent: AtomicU64,
    send_failures: AtomicU64,
    signals_routed: AtomicU64,
    signals_dropped: AtomicU64,
    messages_sent: AtomicU64,
    messages_delivered: AtomicU64,
    messages_queued: AtomicU64,
    queue_evictions: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection was registered.
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// A connection was removed.
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// An inbound frame was read.
    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// An envelope was handed to a connection.
    pub fn envelope_sent(&self) {
        self.envelopes_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// A send was refused by the transport.
    pub fn send_failed(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A signaling message reached its peer.
    pub fn signal_routed(&self) {
        self.signals_routed.fetch_add(1, Ordering::Relaxed);
    }

    /// A signaling message had no peer.
    pub fn signal_dropped(&self) {
        self.signals_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// A chat message was accepted for delivery.
    pub fn message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// A chat message reached its recipient.
    pub fn message_delivered(&self) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// A chat message was queued for an offline recipient.
    pub fn message_queued(&self) {
        self.messages_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// A queued chat message left the queue (flushed, evicted or cleared).
    pub fn message_dequeued(&self, count: u64) {
        let _ = self
            .messages_queued
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(count))
            });
    }

    /// The oldest queued message was dropped on overflow.
    pub fn queue_evicted(&self) {
        self.queue_evictions.fetch_add(1, Ordering::Relaxed);
        self.message_dequeued(1);
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            envelopes_sent: self.envelopes_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            signals_routed: self.signals_routed.load(Ordering::Relaxed),
            signals_dropped: self.signals_dropped.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_queued: self.messages_queued.load(Ordering::Relaxed),
            queue_evictions: self.queue_evictions.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Connections ever registered.
    pub connections_total: u64,
    /// Connections removed.
    pub connections_closed: u64,
    /// Inbound frames read.
    pub frames_received: u64,
    /// Envelopes handed to connections.
    pub envelopes_sent: u64,
    /// Sends refused by the transport.
    pub send_failures: u64,
    /// Signaling messages forwarded.
    pub signals_routed: u64,
    /// Signaling messages with no peer.
    pub signals_dropped: u64,
    /// Chat messages accepted.
    pub messages_sent: u64,
    /// Chat messages delivered.
    pub messages_delivered: u64,
    /// Chat messages currently waiting in offline queues.
    pub messages_queued: u64,
    /// Queued messages dropped on overflow.
    pub queue_evictions: u64,
}

impl MetricsSnapshot {
    /// Connections currently open.
    pub fn connections_active(&self) -> u64 {
        self.connections_total.saturating_sub(self.connections_closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dequeue_never_underflows() {
        let metrics = RealtimeMetrics::new();
        metrics.message_queued();
        metrics.message_dequeued(5);
        assert_eq!(metrics.snapshot().messages_queued, 0);
    }

    #[test]
    fn test_active_connections() {
        let metrics = RealtimeMetrics::new();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();
        assert_eq!(metrics.snapshot().connections_active(), 1);
    }
}
