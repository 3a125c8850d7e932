//! Ledger transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use consulthub_core::types::{SessionId, TransactionId, UserId};

/// What a transaction moves money for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Client paid for a session.
    Payment,
    /// Money returned to a client.
    Refund,
    /// Advisor earnings paid out.
    Payout,
}

/// Settlement state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Not yet settled.
    Pending,
    /// Settled.
    Completed,
    /// Contested by the client.
    Disputed,
    /// Could not be settled.
    Failed,
}

/// A recorded ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Storage-assigned identifier.
    pub id: TransactionId,
    /// Session the money relates to.
    pub session_id: SessionId,
    /// Paying or refunded client.
    pub user_id: Option<UserId>,
    /// Paid-out advisor.
    pub advisor_id: Option<UserId>,
    /// Amount, in minor units (always positive).
    pub amount: f64,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Settlement state.
    pub status: TransactionStatus,
    /// Payment or payout method.
    pub method: Option<String>,
    /// Refund reason.
    pub reason: Option<String>,
    /// When it was recorded.
    pub created_at: DateTime<Utc>,
}

/// Data required to record a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    /// Session the money relates to.
    pub session_id: SessionId,
    /// Paying or refunded client.
    pub user_id: Option<UserId>,
    /// Paid-out advisor.
    pub advisor_id: Option<UserId>,
    /// Amount, in minor units.
    pub amount: f64,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Settlement state.
    pub status: TransactionStatus,
    /// Payment or payout method.
    pub method: Option<String>,
    /// Refund reason.
    pub reason: Option<String>,
}
