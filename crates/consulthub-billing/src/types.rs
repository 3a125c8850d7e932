//! Billing request and result value objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use consulthub_core::types::{SessionId, TransactionId, UserId};
use consulthub_entity::session::SessionType;
use consulthub_entity::wallet::Transaction;

/// Input to a cost calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBillingData {
    /// Session being billed.
    pub session_id: SessionId,
    /// Advisor who delivered it.
    pub advisor_id: UserId,
    /// Paying client, used for the discount lookup.
    pub user_id: Option<UserId>,
    /// When billing started.
    pub start_time: DateTime<Utc>,
    /// When billing stopped.
    pub end_time: DateTime<Utc>,
    /// Price per started minute.
    pub rate_per_minute: f64,
    /// Session kind.
    pub session_type: Option<SessionType>,
}

/// How a cost was computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    /// Rate applied per minute.
    pub base_rate: f64,
    /// Billed minutes.
    pub minutes: i64,
    /// Total after discount.
    pub total: f64,
    /// Discount subtracted, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
}

/// Result of a cost calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingResult {
    /// Billed minutes (at least 1).
    pub duration: i64,
    /// Amount owed, rounded to 2 decimals.
    pub cost: f64,
    /// Calculation details.
    pub breakdown: CostBreakdown,
    /// Free session (zero rate or free consultation).
    pub is_free: bool,
}

/// A wallet payment for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Session paid for.
    pub session_id: SessionId,
    /// Paying client.
    pub user_id: UserId,
    /// Amount to charge.
    pub amount: f64,
    /// Payment method label.
    pub payment_method: String,
}

/// A refund to a client's wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    /// Session refunded.
    pub session_id: SessionId,
    /// Refunded client.
    pub user_id: UserId,
    /// Amount to return.
    pub amount: f64,
    /// Why the refund was issued.
    pub reason: String,
}

/// Outcome of a payment, refund or payout.
///
/// Failures are values, never errors, so callers can branch on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    /// Whether money moved.
    pub success: bool,
    /// Recorded ledger entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    /// Amount moved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentResult {
    /// A successful transfer.
    pub fn completed(transaction_id: TransactionId, amount: f64) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id),
            amount: Some(amount),
            error: None,
        }
    }

    /// A failed transfer.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            amount: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregate billing state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingState {
    /// Nothing settled yet, or a payment is still pending.
    Pending,
    /// Paid.
    Completed,
    /// A transaction is disputed.
    Disputed,
    /// Payments were fully refunded.
    Refunded,
}

/// Billing status folded from a session's transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatus {
    /// Aggregate state.
    pub status: BillingState,
    /// Payments minus refunds.
    pub total_amount: f64,
    /// Sum of pending payments, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_amount: Option<f64>,
    /// Whether any transaction is disputed.
    pub has_dispute: bool,
    /// The session's ledger.
    pub transactions: Vec<Transaction>,
}

/// Input to a payout calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    /// Session the earnings come from.
    pub session_id: SessionId,
    /// Advisor paid.
    pub advisor_id: UserId,
    /// Gross amount charged to the client.
    pub total_amount: f64,
    /// Platform fee rate; the configured default applies when absent.
    #[serde(default)]
    pub platform_fee: Option<f64>,
}

/// Result of a payout calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutResult {
    /// Amount charged to the client.
    pub gross_amount: f64,
    /// Platform's share.
    pub platform_fee: f64,
    /// Advisor's share.
    pub net_amount: f64,
    /// Fee rate as a whole percentage.
    pub fee_percentage: i64,
}

/// A payout to execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutTransfer {
    /// Advisor paid.
    pub advisor_id: UserId,
    /// Session the earnings come from.
    pub session_id: SessionId,
    /// Net amount to pay out.
    pub amount: f64,
    /// Payout method; the configured default applies when absent.
    #[serde(default)]
    pub payout_method: Option<String>,
}

/// Inclusive report window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Window start.
    pub start_date: DateTime<Utc>,
    /// Window end.
    pub end_date: DateTime<Utc>,
}

/// Revenue over a date range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingReport {
    /// Completed payments.
    pub total_revenue: f64,
    /// Completed refunds.
    pub total_refunds: f64,
    /// Revenue minus refunds.
    pub net_revenue: f64,
    /// Completed transactions counted.
    pub transaction_count: u64,
}

/// Running payment metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingMetrics {
    /// Mean amount of successful payments.
    pub average_session_cost: f64,
    /// Sum of successful payments.
    pub total_processed_amount: f64,
    /// Successful payments as a percentage of attempts.
    pub success_rate: f64,
}
