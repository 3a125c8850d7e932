//! Arena of cancellable billing-tick timers keyed by session id.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use consulthub_core::types::SessionId;

/// Handle given to a tick task when it is armed.
#[derive(Debug, Clone)]
pub struct TickGuard {
    /// Cancelled when the session leaves the active state.
    pub cancel: CancellationToken,
    /// Held by the tick while it persists, and by the end transition while
    /// it finalizes, so the two never interleave.
    pub gate: Arc<Mutex<()>>,
}

/// At most one live billing tick per session.
#[derive(Debug, Default)]
pub struct BillingTicks {
    ticks: DashMap<SessionId, TickGuard>,
}

impl BillingTicks {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a tick for a session. Returns `None` if one is already armed.
    pub fn arm(&self, session_id: SessionId) -> Option<TickGuard> {
        match self.ticks.entry(session_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let guard = TickGuard {
                    cancel: CancellationToken::new(),
                    gate: Arc::new(Mutex::new(())),
                };
                slot.insert(guard.clone());
                Some(guard)
            }
        }
    }

    /// Cancel and forget a session's tick.
    ///
    /// Returns the gate so the caller can wait for an in-flight tick.
    pub fn cancel(&self, session_id: SessionId) -> Option<Arc<Mutex<()>>> {
        self.ticks.remove(&session_id).map(|(_, guard)| {
            guard.cancel.cancel();
            guard.gate
        })
    }

    /// Cancel every tick.
    pub fn cancel_all(&self) {
        for entry in self.ticks.iter() {
            entry.value().cancel.cancel();
        }
        self.ticks.clear();
    }

    /// Whether a session has a live tick.
    pub fn is_armed(&self, session_id: SessionId) -> bool {
        self.ticks.contains_key(&session_id)
    }

    /// Number of live ticks.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Returns `true` if no tick is armed.
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tick_per_session() {
        let ticks = BillingTicks::new();
        let id = SessionId::new(3);

        let guard = ticks.arm(id).unwrap();
        assert!(ticks.arm(id).is_none());
        assert!(ticks.is_armed(id));

        assert!(ticks.cancel(id).is_some());
        assert!(guard.cancel.is_cancelled());
        assert!(!ticks.is_armed(id));
        assert!(ticks.cancel(id).is_none());
        assert!(ticks.arm(id).is_some());
    }

    #[test]
    fn test_cancel_all() {
        let ticks = BillingTicks::new();
        let a = ticks.arm(SessionId::new(1)).unwrap();
        let b = ticks.arm(SessionId::new(2)).unwrap();
        ticks.cancel_all();
        assert!(a.cancel.is_cancelled());
        assert!(b.cancel.is_cancelled());
        assert!(ticks.is_empty());
    }
}
