//! Typing indicators with a self-clearing timer per (session, user).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use consulthub_core::types::{SessionId, UserId};

use crate::connection::registry::{ConnectionRegistry, RegistryEvent};
use crate::message::builder::build_typing;

type TimerKey = (SessionId, UserId);

#[derive(Debug)]
struct TypingTimer {
    generation: u64,
    cancel: CancellationToken,
}

/// Broadcasts typing indicators and auto-stops them after a timeout.
///
/// At most one timer is live per `(session, user)` pair; each new typing
/// event replaces it. A timer fires only if it is still the current one,
/// so the automatic "stopped typing" event is emitted exactly once.
#[derive(Debug)]
pub struct TypingTracker {
    registry: Arc<ConnectionRegistry>,
    timeout: Duration,
    timers: DashMap<TimerKey, TypingTimer>,
    next_generation: AtomicU64,
}

impl TypingTracker {
    /// Creates a tracker with the given auto-stop timeout.
    pub fn new(registry: Arc<ConnectionRegistry>, timeout: Duration) -> Self {
        Self {
            registry,
            timeout,
            timers: DashMap::new(),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Records a typing change and notifies the other session members.
    pub fn set_typing(self: &Arc<Self>, session_id: SessionId, user_id: UserId, is_typing: bool) {
        let key = (session_id, user_id);
        if let Some((_, timer)) = self.timers.remove(&key) {
            timer.cancel.cancel();
        }

        self.notify(session_id, user_id, is_typing);

        if is_typing {
            self.arm(key);
        }
    }

    fn arm(self: &Arc<Self>, key: TimerKey) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let replaced = self.timers.insert(
            key,
            TypingTimer {
                generation,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = replaced {
            previous.cancel.cancel();
        }

        let tracker = Arc::clone(self);
        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(timeout) => {}
            }

            let expired = tracker
                .timers
                .remove_if(&key, |_, timer| timer.generation == generation)
                .is_some();
            if expired {
                let (session_id, user_id) = key;
                debug!(session_id = %session_id, user_id = %user_id, "Typing indicator timed out");
                tracker.notify(session_id, user_id, false);
            }
        });
    }

    fn notify(&self, session_id: SessionId, user_id: UserId, is_typing: bool) -> usize {
        let envelope = build_typing(session_id, user_id, is_typing);
        self.registry
            .users_in_session(session_id)
            .into_iter()
            .filter(|member| *member != user_id)
            .filter(|member| self.registry.send(*member, &envelope))
            .count()
    }

    /// Cancels the timer of one pair without notifying anyone.
    pub fn cancel(&self, session_id: SessionId, user_id: UserId) {
        if let Some((_, timer)) = self.timers.remove(&(session_id, user_id)) {
            timer.cancel.cancel();
        }
    }

    /// Cancels every timer of a user.
    pub fn cancel_user(&self, user_id: UserId) {
        self.timers.retain(|(_, user), timer| {
            if *user == user_id {
                timer.cancel.cancel();
                false
            } else {
                true
            }
        });
    }

    /// Cancels every timer.
    pub fn cancel_all(&self) {
        self.timers.retain(|_, timer| {
            timer.cancel.cancel();
            false
        });
    }

    /// Number of live timers.
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Cancels timers as users leave sessions or disconnect.
    pub fn spawn_registry_listener(
        self: Arc<Self>,
        mut events: broadcast::Receiver<RegistryEvent>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.recv() => event,
                };

                match event {
                    Ok(RegistryEvent::LeftSession {
                        user_id,
                        session_id,
                    }) => self.cancel(session_id, user_id),
                    Ok(RegistryEvent::Disconnected { user_id, .. }) => self.cancel_user(user_id),
                    Ok(RegistryEvent::Connected { .. }) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Typing listener lagged behind registry events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            self.cancel_all();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::handle::OutboundFrame;
    use crate::metrics::RealtimeMetrics;
    use tokio::sync::mpsc;

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        tracker: Arc<TypingTracker>,
        watcher: mpsc::Receiver<OutboundFrame>,
        _typist: mpsc::Receiver<OutboundFrame>,
    }

    const SESSION: SessionId = SessionId::new(1);
    const TYPIST: UserId = UserId::new(10);
    const WATCHER: UserId = UserId::new(20);

    fn fixture() -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new(32, Arc::new(RealtimeMetrics::new())));
        let (_h1, typist) = registry.connect(TYPIST);
        let (_h2, watcher) = registry.connect(WATCHER);
        registry.join_session(TYPIST, SESSION);
        registry.join_session(WATCHER, SESSION);
        let tracker = Arc::new(TypingTracker::new(
            registry.clone(),
            Duration::from_millis(5000),
        ));
        Fixture {
            registry,
            tracker,
            watcher,
            _typist: typist,
        }
    }

    fn drain_typing(rx: &mut mpsc::Receiver<OutboundFrame>) -> Vec<bool> {
        let mut states = Vec::new();
        while let Ok(OutboundFrame::Text(text)) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["type"], "typing_indicator");
            assert_eq!(value["from"], 10);
            states.push(value["payload"]["isTyping"].as_bool().unwrap());
        }
        states
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_fires_exactly_once() {
        let mut f = fixture();
        f.tracker.set_typing(SESSION, TYPIST, true);
        assert_eq!(drain_typing(&mut f.watcher), vec![true]);

        tokio::time::sleep(Duration::from_millis(4999)).await;
        assert!(drain_typing(&mut f.watcher).is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(drain_typing(&mut f.watcher), vec![false]);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(drain_typing(&mut f.watcher).is_empty());
        assert_eq!(f.tracker.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewal_replaces_timer() {
        let mut f = fixture();
        f.tracker.set_typing(SESSION, TYPIST, true);
        tokio::time::sleep(Duration::from_secs(3)).await;
        f.tracker.set_typing(SESSION, TYPIST, true);
        assert_eq!(f.tracker.active_timers(), 1);

        // The first timer would have fired at 5 s.
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(drain_typing(&mut f.watcher), vec![true, true]);

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(drain_typing(&mut f.watcher), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_stop_cancels_timer() {
        let mut f = fixture();
        f.tracker.set_typing(SESSION, TYPIST, true);
        f.tracker.set_typing(SESSION, TYPIST, false);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(drain_typing(&mut f.watcher), vec![true, false]);
        assert_eq!(f.tracker.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_session_cancels_timer() {
        let mut f = fixture();
        let shutdown = CancellationToken::new();
        let listener = f
            .tracker
            .clone()
            .spawn_registry_listener(f.registry.subscribe(), shutdown.clone());

        f.tracker.set_typing(SESSION, TYPIST, true);
        f.registry.leave_session(TYPIST, SESSION);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(drain_typing(&mut f.watcher), vec![true]);
        assert_eq!(f.tracker.active_timers(), 0);

        shutdown.cancel();
        listener.await.unwrap();
    }
}
