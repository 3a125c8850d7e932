//! Individual transport connection handle.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use consulthub_core::types::UserId;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// A frame queued for the socket writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A text frame (serialized envelope, or the literal `pong`).
    Text(String),
    /// A transport-level liveness probe.
    Ping,
    /// Close the socket.
    Close,
}

/// A handle to a single live connection.
///
/// Holds the sender side of the socket writer's channel plus liveness
/// metadata. The registry owns the handle; the socket task keeps a clone.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// User who owns this connection.
    pub user_id: UserId,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<OutboundFrame>,
    last_heartbeat: RwLock<Instant>,
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle.
    pub fn new(user_id: UserId, sender: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            connected_at: Utc::now(),
            sender,
            last_heartbeat: RwLock::new(Instant::now()),
            alive: AtomicBool::new(true),
        }
    }

    /// Push a frame to the socket writer.
    ///
    /// Returns `false` if the connection is closed or its buffer is full.
    pub fn send(&self, frame: OutboundFrame) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Connection send buffer full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.sender.is_closed()
    }

    /// Mark the connection as dead.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Ask the writer to close the socket and mark the handle dead.
    pub fn close(&self) {
        if self.is_alive() {
            let _ = self.sender.try_send(OutboundFrame::Close);
        }
        self.mark_dead();
    }

    /// Record a liveness reply.
    pub fn record_heartbeat(&self) {
        let mut last = self
            .last_heartbeat
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *last = Instant::now();
    }

    /// When the last liveness reply was seen.
    pub fn last_heartbeat(&self) -> Instant {
        *self
            .last_heartbeat
            .read()
            .unwrap_or_else(|e| e.into_inner())
    }
}
