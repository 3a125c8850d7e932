//! Bounded per-recipient offline queue.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use consulthub_core::types::UserId;

use crate::message::types::Envelope;

/// Per-user FIFO of envelopes awaiting reconnect.
///
/// Each queue holds at most `capacity` entries; pushing onto a full queue
/// evicts the oldest entry.
#[derive(Debug)]
pub struct OfflineQueue {
    capacity: usize,
    queues: DashMap<UserId, VecDeque<Envelope>>,
}

impl OfflineQueue {
    /// Creates an empty queue set.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queues: DashMap::new(),
        }
    }

    /// Appends an envelope. Returns `true` if the oldest entry was evicted.
    pub fn push(&self, user_id: UserId, envelope: Envelope) -> bool {
        let mut queue = self.queues.entry(user_id).or_default();
        push_bounded(&mut queue, envelope, self.capacity)
    }

    /// Hands an envelope to `deliver` if nothing is waiting for the user,
    /// otherwise appends it behind the waiting envelopes.
    ///
    /// Runs under the user's queue entry, so it cannot overtake a
    /// concurrent [`Self::flush`].
    pub fn deliver_or_push<F>(&self, user_id: UserId, envelope: Envelope, deliver: F) -> Placement
    where
        F: FnOnce(&Envelope) -> bool,
    {
        match self.queues.entry(user_id) {
            Entry::Occupied(mut entry) => Placement::Queued {
                evicted: push_bounded(entry.get_mut(), envelope, self.capacity),
            },
            Entry::Vacant(slot) => {
                if deliver(&envelope) {
                    return Placement::Delivered;
                }
                slot.insert(VecDeque::from([envelope]));
                Placement::Queued { evicted: false }
            }
        }
    }

    /// Hands a user's envelopes to `deliver` in timestamp order and returns
    /// the delivered ones.
    ///
    /// Stops at the first envelope `deliver` refuses; it and everything
    /// after it stay queued. The sort is stable, so envelopes with equal
    /// timestamps keep their insertion order.
    pub fn flush<F>(&self, user_id: UserId, mut deliver: F) -> Vec<Envelope>
    where
        F: FnMut(&Envelope) -> bool,
    {
        let Entry::Occupied(mut entry) = self.queues.entry(user_id) else {
            return Vec::new();
        };

        let queue = entry.get_mut();
        queue.make_contiguous().sort_by_key(sort_key);

        let mut delivered = Vec::new();
        while let Some(envelope) = queue.front() {
            if !deliver(envelope) {
                break;
            }
            if let Some(envelope) = queue.pop_front() {
                delivered.push(envelope);
            }
        }
        if queue.is_empty() {
            entry.remove();
        }
        delivered
    }

    /// Copy of a user's queue in insertion order.
    pub fn snapshot(&self, user_id: UserId) -> Vec<Envelope> {
        self.queues
            .get(&user_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of envelopes queued for a user.
    pub fn len(&self, user_id: UserId) -> usize {
        self.queues.get(&user_id).map_or(0, |queue| queue.len())
    }

    /// Queue length of every user with a non-empty queue.
    pub fn sizes(&self) -> BTreeMap<UserId, usize> {
        self.queues
            .iter()
            .filter(|e| !e.value().is_empty())
            .map(|e| (*e.key(), e.value().len()))
            .collect()
    }

    /// Drops a user's queue. Returns how many envelopes were removed.
    pub fn clear(&self, user_id: UserId) -> usize {
        self.queues
            .remove(&user_id)
            .map_or(0, |(_, queue)| queue.len())
    }
}

/// Where [`OfflineQueue::deliver_or_push`] put an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Handed straight to the transport.
    Delivered,
    /// Appended to the user's queue.
    Queued {
        /// Whether the oldest entry was dropped to make room.
        evicted: bool,
    },
}

fn push_bounded(queue: &mut VecDeque<Envelope>, envelope: Envelope, capacity: usize) -> bool {
    queue.push_back(envelope);
    if queue.len() > capacity {
        queue.pop_front();
        return true;
    }
    false
}

fn sort_key(envelope: &Envelope) -> DateTime<Utc> {
    envelope.timestamp.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::MessageType;
    use chrono::Duration;
    use serde_json::json;

    fn envelope(seq: u32, at: DateTime<Utc>) -> Envelope {
        Envelope::new(MessageType::ChatMessage, &json!({ "seq": seq })).at(at)
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let queue = OfflineQueue::new(100);
        let user = UserId::new(1);
        let base = Utc::now();

        let mut evicted = 0;
        for seq in 0..101 {
            if queue.push(user, envelope(seq, base + Duration::milliseconds(seq as i64))) {
                evicted += 1;
            }
        }

        assert_eq!(evicted, 1);
        assert_eq!(queue.len(user), 100);
        assert_eq!(queue.snapshot(user)[0].payload["seq"], 1);
        assert_eq!(queue.snapshot(user)[99].payload["seq"], 100);
    }

    fn seqs(envelopes: &[Envelope]) -> Vec<u64> {
        envelopes
            .iter()
            .map(|e| e.payload["seq"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn test_flush_orders_by_timestamp() {
        let queue = OfflineQueue::new(10);
        let user = UserId::new(2);
        let base = Utc::now();

        queue.push(user, envelope(2, base + Duration::seconds(2)));
        queue.push(user, envelope(0, base));
        queue.push(user, envelope(1, base + Duration::seconds(1)));

        let delivered = queue.flush(user, |_| true);
        assert_eq!(seqs(&delivered), vec![0, 1, 2]);
        assert_eq!(queue.len(user), 0);
        assert!(queue.sizes().is_empty());
    }

    #[test]
    fn test_refused_flush_keeps_remainder_in_order() {
        let queue = OfflineQueue::new(10);
        let user = UserId::new(3);
        let base = Utc::now();
        for seq in 0..3 {
            queue.push(user, envelope(seq, base + Duration::seconds(seq as i64)));
        }

        let mut budget = 1;
        let delivered = queue.flush(user, |_| {
            budget -= 1;
            budget >= 0
        });
        assert_eq!(seqs(&delivered), vec![0]);
        assert_eq!(seqs(&queue.snapshot(user)), vec![1, 2]);
    }

    #[test]
    fn test_deliver_or_push_waits_behind_queued_envelopes() {
        let queue = OfflineQueue::new(10);
        let user = UserId::new(4);
        let base = Utc::now();

        let placement = queue.deliver_or_push(user, envelope(0, base), |_| false);
        assert_eq!(placement, Placement::Queued { evicted: false });

        let placement =
            queue.deliver_or_push(user, envelope(1, base + Duration::seconds(1)), |_| true);
        assert_eq!(placement, Placement::Queued { evicted: false });
        assert_eq!(seqs(&queue.snapshot(user)), vec![0, 1]);

        queue.flush(user, |_| true);
        let placement =
            queue.deliver_or_push(user, envelope(2, base + Duration::seconds(2)), |_| true);
        assert_eq!(placement, Placement::Delivered);
        assert_eq!(queue.len(user), 0);
    }

    #[test]
    fn test_clear_and_sizes() {
        let queue = OfflineQueue::new(10);
        queue.push(UserId::new(1), envelope(0, Utc::now()));
        queue.push(UserId::new(1), envelope(1, Utc::now()));
        queue.push(UserId::new(2), envelope(0, Utc::now()));

        let sizes = queue.sizes();
        assert_eq!(sizes.get(&UserId::new(1)), Some(&2));
        assert_eq!(queue.clear(UserId::new(1)), 2);
        assert_eq!(queue.clear(UserId::new(1)), 0);
        assert_eq!(queue.sizes().len(), 1);
    }
}
