//! Wallet, advisor account and ledger trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use consulthub_core::result::AppResult;
use consulthub_core::types::{SessionId, UserId};
use consulthub_entity::wallet::{AdvisorAccount, NewTransaction, Transaction};

/// Balance and ledger storage used by the billing engine.
///
/// Debits are a single conditional update: implementations must check and
/// decrement the balance atomically so concurrent session endings for the
/// same user cannot both spend the same funds.
#[async_trait]
pub trait WalletStore: Send + Sync + 'static {
    /// Current wallet balance of a user (0 for unknown users).
    async fn get_user_balance(&self, user_id: UserId) -> AppResult<f64>;

    /// Debit `amount` only if the balance covers it.
    ///
    /// Returns the new balance, or `None` when funds are insufficient.
    async fn debit_user_balance(&self, user_id: UserId, amount: f64) -> AppResult<Option<f64>>;

    /// Credit `amount` and return the new balance.
    async fn credit_user_balance(&self, user_id: UserId, amount: f64) -> AppResult<f64>;

    /// Per-user discount rate, if any.
    async fn get_user_discount_rate(&self, user_id: UserId) -> AppResult<Option<f64>>;

    /// Advisor account (for custom fee rates).
    async fn get_advisor(&self, advisor_id: UserId) -> AppResult<Option<AdvisorAccount>>;

    /// Credit an advisor's earnings and return the new total.
    async fn credit_advisor_earnings(&self, advisor_id: UserId, amount: f64) -> AppResult<f64>;

    /// Record a ledger transaction.
    async fn create_transaction(&self, transaction: &NewTransaction) -> AppResult<Transaction>;

    /// All transactions of a session, oldest first.
    async fn transactions_by_session(&self, session_id: SessionId) -> AppResult<Vec<Transaction>>;

    /// All transactions recorded within `[from, to]`.
    async fn transactions_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Transaction>>;
}
