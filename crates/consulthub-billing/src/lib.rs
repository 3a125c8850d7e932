//! # consulthub-billing
//!
//! Billing engine for ConsultHub sessions:
//!
//! - Per-minute cost calculation with free sessions and user discounts
//! - Wallet payments (atomic conditional debit) and refunds
//! - Billing status folded from a session's ledger
//! - Advisor payout calculation and processing
//! - Revenue reports and running payment metrics

pub mod engine;
pub mod metrics;
pub mod types;
pub mod validation;

pub use engine::BillingEngine;
pub use metrics::BillingCounters;
pub use types::{
    BillingMetrics, BillingReport, BillingResult, BillingState, BillingStatus, CostBreakdown,
    DateRange, PaymentRequest, PaymentResult, PayoutRequest, PayoutResult, PayoutTransfer,
    RefundRequest, SessionBillingData,
};
