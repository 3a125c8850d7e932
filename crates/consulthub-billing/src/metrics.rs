//! Running payment counters.

use std::sync::atomic::{AtomicU64, Ordering};

use consulthub_core::types::round_currency;

use crate::types::BillingMetrics;

/// Payment counters; amounts are accumulated in cents.
#[derive(Debug, Default)]
pub struct BillingCounters {
    payments_attempted: AtomicU64,
    payments_succeeded: AtomicU64,
    processed_cents: AtomicU64,
}

impl BillingCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A payment was attempted.
    pub fn payment_attempted(&self) {
        self.payments_attempted.fetch_add(1, Ordering::Relaxed);
    }

    /// A payment of `amount` succeeded.
    pub fn payment_succeeded(&self, amount: f64) {
        self.payments_succeeded.fetch_add(1, Ordering::Relaxed);
        let cents = (amount * 100.0).round().max(0.0) as u64;
        self.processed_cents.fetch_add(cents, Ordering::Relaxed);
    }

    /// Derive the public metrics view.
    ///
    /// The success rate reads 100 before any payment was attempted.
    pub fn snapshot(&self) -> BillingMetrics {
        let attempted = self.payments_attempted.load(Ordering::Relaxed);
        let succeeded = self.payments_succeeded.load(Ordering::Relaxed);
        let total = self.processed_cents.load(Ordering::Relaxed) as f64 / 100.0;

        let average_session_cost = if succeeded > 0 {
            round_currency(total / succeeded as f64)
        } else {
            0.0
        };
        let success_rate = if attempted > 0 {
            round_currency(succeeded as f64 / attempted as f64 * 100.0)
        } else {
            100.0
        };

        BillingMetrics {
            average_session_cost,
            total_processed_amount: round_currency(total),
            success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let metrics = BillingCounters::new().snapshot();
        assert_eq!(metrics.average_session_cost, 0.0);
        assert_eq!(metrics.total_processed_amount, 0.0);
        assert_eq!(metrics.success_rate, 100.0);
    }

    #[test]
    fn test_snapshot_after_payments() {
        let counters = BillingCounters::new();
        for _ in 0..4 {
            counters.payment_attempted();
        }
        counters.payment_succeeded(10.5);
        counters.payment_succeeded(20.0);
        counters.payment_succeeded(30.25);

        let metrics = counters.snapshot();
        assert_eq!(metrics.total_processed_amount, 60.75);
        assert_eq!(metrics.average_session_cost, 20.25);
        assert_eq!(metrics.success_rate, 75.0);
    }
}
