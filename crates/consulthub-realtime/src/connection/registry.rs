//! Connection registry: who is connected, since when, and in which sessions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use consulthub_core::types::{SessionId, UserId};

use crate::message::types::Envelope;
use crate::metrics::RealtimeMetrics;

use super::handle::{ConnectionHandle, ConnectionId, OutboundFrame};

/// Capacity of the registry event channel.
const EVENT_BUFFER: usize = 1024;

/// Membership and lifecycle changes published by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A user registered a connection (new or replacing an old one).
    Connected {
        /// User.
        user_id: UserId,
    },
    /// A user was removed from one session.
    LeftSession {
        /// User.
        user_id: UserId,
        /// Session left.
        session_id: SessionId,
    },
    /// A user's connection was removed, along with all memberships.
    Disconnected {
        /// User.
        user_id: UserId,
        /// Sessions the user was part of.
        sessions: Vec<SessionId>,
    },
}

/// Both directions of the session membership index.
#[derive(Debug, Default)]
struct SessionIndex {
    by_session: HashMap<SessionId, HashSet<UserId>>,
    by_user: HashMap<UserId, HashSet<SessionId>>,
}

impl SessionIndex {
    fn insert(&mut self, user_id: UserId, session_id: SessionId) {
        self.by_user.entry(user_id).or_default().insert(session_id);
        self.by_session.entry(session_id).or_default().insert(user_id);
    }

    fn remove(&mut self, user_id: UserId, session_id: SessionId) -> bool {
        if let Some(sessions) = self.by_user.get_mut(&user_id) {
            sessions.remove(&session_id);
            if sessions.is_empty() {
                self.by_user.remove(&user_id);
            }
        }
        let Some(users) = self.by_session.get_mut(&session_id) else {
            return false;
        };
        let removed = users.remove(&user_id);
        if users.is_empty() {
            self.by_session.remove(&session_id);
        }
        removed
    }

    fn remove_user(&mut self, user_id: UserId) -> Vec<SessionId> {
        let sessions = sorted(self.by_user.remove(&user_id).unwrap_or_default());
        for session_id in &sessions {
            if let Some(users) = self.by_session.get_mut(session_id) {
                users.remove(&user_id);
                if users.is_empty() {
                    self.by_session.remove(session_id);
                }
            }
        }
        sessions
    }

    fn remove_session(&mut self, session_id: SessionId) -> Vec<UserId> {
        let users = sorted(self.by_session.remove(&session_id).unwrap_or_default());
        for user_id in &users {
            if let Some(sessions) = self.by_user.get_mut(user_id) {
                sessions.remove(&session_id);
                if sessions.is_empty() {
                    self.by_user.remove(user_id);
                }
            }
        }
        users
    }
}

fn sorted<T: Ord>(set: HashSet<T>) -> Vec<T> {
    let mut items: Vec<T> = set.into_iter().collect();
    items.sort();
    items
}

/// Tracks live connections and the session membership index.
///
/// The index is kept in both directions, user → sessions and session →
/// users, under one lock. Only connected users can join a session; the
/// connection check happens under that lock, and disconnecting removes the
/// user from every session after the connection is gone, so a join racing a
/// disconnect never leaves an offline member behind.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<UserId, Arc<ConnectionHandle>>,
    index: Mutex<SessionIndex>,
    events: broadcast::Sender<RegistryEvent>,
    metrics: Arc<RealtimeMetrics>,
    buffer_size: usize,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new(buffer_size: usize, metrics: Arc<RealtimeMetrics>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            connections: DashMap::new(),
            index: Mutex::new(SessionIndex::default()),
            events,
            metrics,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Subscribe to membership and lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Registers a connection for `user_id`.
    ///
    /// Returns the handle and the receiver the socket writer drains. An
    /// existing connection for the same user is closed and replaced; its
    /// session memberships carry over.
    pub fn connect(&self, user_id: UserId) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let handle = Arc::new(ConnectionHandle::new(user_id, tx));

        if let Some(previous) = self.connections.insert(user_id, handle.clone()) {
            previous.close();
            self.metrics.connection_closed();
            info!(
                user_id = %user_id,
                old_conn_id = %previous.id,
                conn_id = %handle.id,
                "Connection replaced"
            );
        } else {
            info!(user_id = %user_id, conn_id = %handle.id, "User connected");
        }

        self.metrics.connection_opened();
        self.emit(RegistryEvent::Connected { user_id });
        (handle, rx)
    }

    /// Removes a user's connection and every session membership.
    ///
    /// Returns `false` if the user was not connected.
    pub fn disconnect(&self, user_id: UserId) -> bool {
        match self.connections.remove(&user_id) {
            Some((_, handle)) => {
                self.finish_disconnect(&handle);
                true
            }
            None => false,
        }
    }

    /// Removes a specific connection, leaving a newer replacement alone.
    pub fn disconnect_connection(&self, user_id: UserId, conn_id: ConnectionId) -> bool {
        match self
            .connections
            .remove_if(&user_id, |_, handle| handle.id == conn_id)
        {
            Some((_, handle)) => {
                self.finish_disconnect(&handle);
                true
            }
            None => false,
        }
    }

    fn finish_disconnect(&self, handle: &ConnectionHandle) {
        handle.close();
        let sessions = self.index().remove_user(handle.user_id);
        self.metrics.connection_closed();

        info!(
            user_id = %handle.user_id,
            conn_id = %handle.id,
            sessions = sessions.len(),
            "User disconnected"
        );

        self.emit(RegistryEvent::Disconnected {
            user_id: handle.user_id,
            sessions,
        });
    }

    fn index(&self) -> MutexGuard<'_, SessionIndex> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sends an envelope to a user.
    ///
    /// Returns `false` if the user is offline or the transport refused the
    /// frame; a closed transport is cleaned up as a disconnect.
    pub fn send(&self, user_id: UserId, envelope: &Envelope) -> bool {
        match serde_json::to_string(envelope) {
            Ok(text) => self.send_frame(user_id, OutboundFrame::Text(text)),
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to serialize envelope");
                false
            }
        }
    }

    /// Sends a raw frame to a user.
    pub fn send_frame(&self, user_id: UserId, frame: OutboundFrame) -> bool {
        let Some(handle) = self.connections.get(&user_id).map(|h| h.value().clone()) else {
            return false;
        };

        if handle.send(frame) {
            self.metrics.envelope_sent();
            return true;
        }

        self.metrics.send_failed();
        if !handle.is_alive() {
            warn!(user_id = %user_id, conn_id = %handle.id, "Transport closed, cleaning up");
            self.disconnect_connection(user_id, handle.id);
        }
        false
    }

    /// Sends an envelope to every connected user except `excluding`.
    ///
    /// Returns the number of users reached.
    pub fn broadcast(&self, envelope: &Envelope, excluding: &[UserId]) -> usize {
        self.connected_users()
            .into_iter()
            .filter(|user_id| !excluding.contains(user_id))
            .filter(|user_id| self.send(*user_id, envelope))
            .count()
    }

    /// Whether the user has a writable connection.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.connections
            .get(&user_id)
            .is_some_and(|handle| handle.is_alive())
    }

    /// Adds a connected user to a session. Returns `false` if the user is
    /// not connected.
    pub fn join_session(&self, user_id: UserId, session_id: SessionId) -> bool {
        let mut index = self.index();
        if !self.connections.contains_key(&user_id) {
            debug!(user_id = %user_id, session_id = %session_id, "Join ignored, user offline");
            return false;
        }

        index.insert(user_id, session_id);
        debug!(user_id = %user_id, session_id = %session_id, "User joined session");
        true
    }

    /// Removes a user from a session. No-op if the user is not a member.
    pub fn leave_session(&self, user_id: UserId, session_id: SessionId) -> bool {
        let removed = self.index().remove(user_id, session_id);
        if removed {
            debug!(user_id = %user_id, session_id = %session_id, "User left session");
            self.emit(RegistryEvent::LeftSession {
                user_id,
                session_id,
            });
        }
        removed
    }

    /// Removes every member from a session and returns who was removed.
    pub fn remove_session(&self, session_id: SessionId) -> Vec<UserId> {
        let users = self.index().remove_session(session_id);
        for user_id in &users {
            self.emit(RegistryEvent::LeftSession {
                user_id: *user_id,
                session_id,
            });
        }
        users
    }

    /// Members of a session, in ascending id order.
    pub fn users_in_session(&self, session_id: SessionId) -> Vec<UserId> {
        self.index()
            .by_session
            .get(&session_id)
            .map(|set| sorted(set.clone()))
            .unwrap_or_default()
    }

    /// Sessions a user belongs to, in ascending id order.
    pub fn sessions_of(&self, user_id: UserId) -> Vec<SessionId> {
        self.index()
            .by_user
            .get(&user_id)
            .map(|set| sorted(set.clone()))
            .unwrap_or_default()
    }

    /// All connected users, in ascending id order.
    pub fn connected_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.connections.iter().map(|e| *e.key()).collect();
        users.sort();
        users
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Records a liveness reply from a user.
    pub fn record_heartbeat(&self, user_id: UserId) -> bool {
        match self.connections.get(&user_id) {
            Some(handle) => {
                handle.record_heartbeat();
                true
            }
            None => false,
        }
    }

    /// When the user's last liveness reply was seen.
    pub fn last_heartbeat(&self, user_id: UserId) -> Option<Instant> {
        self.connections.get(&user_id).map(|h| h.last_heartbeat())
    }

    /// Users whose last heartbeat is older than `threshold`. Pure.
    pub fn stale_connections(&self, threshold: Duration) -> Vec<UserId> {
        self.stale_connections_at(threshold, Instant::now())
    }

    /// Users whose last heartbeat is older than `threshold` as of `now`.
    pub fn stale_connections_at(&self, threshold: Duration, now: Instant) -> Vec<UserId> {
        let mut stale: Vec<UserId> = self
            .connections
            .iter()
            .filter(|e| now.saturating_duration_since(e.value().last_heartbeat()) > threshold)
            .map(|e| *e.key())
            .collect();
        stale.sort();
        stale
    }

    /// Terminates and removes every stale connection, cascading removal
    /// from all of its sessions. Returns the removed users.
    pub fn sweep_stale(&self, threshold: Duration) -> Vec<UserId> {
        self.sweep_stale_at(threshold, Instant::now())
    }

    /// [`Self::sweep_stale`] evaluated as of `now`.
    pub fn sweep_stale_at(&self, threshold: Duration, now: Instant) -> Vec<UserId> {
        let stale = self.stale_connections_at(threshold, now);
        for user_id in &stale {
            warn!(user_id = %user_id, "Terminating stale connection");
            self.disconnect(*user_id);
        }
        stale
    }

    /// Closes and removes every connection.
    pub fn close_all(&self) {
        let users = self.connected_users();
        for user_id in &users {
            self.disconnect(*user_id);
        }
        info!(count = users.len(), "All connections closed");
    }

    fn emit(&self, event: RegistryEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
