//! In-memory wallet, advisor account and ledger store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use consulthub_core::result::AppResult;
use consulthub_core::types::{SessionId, TransactionId, UserId};
use consulthub_entity::wallet::{AdvisorAccount, NewTransaction, Transaction, UserAccount};

use crate::traits::WalletStore;

#[derive(Debug, Default)]
struct InnerState {
    users: HashMap<UserId, UserAccount>,
    advisors: HashMap<UserId, AdvisorAccount>,
    next_transaction_id: i64,
    transactions: Vec<Transaction>,
}

impl InnerState {
    fn user_mut(&mut self, user_id: UserId) -> &mut UserAccount {
        self.users.entry(user_id).or_insert_with(|| UserAccount {
            user_id,
            balance: 0.0,
            discount_rate: None,
        })
    }

    fn advisor_mut(&mut self, advisor_id: UserId) -> &mut AdvisorAccount {
        self.advisors
            .entry(advisor_id)
            .or_insert_with(|| AdvisorAccount {
                advisor_id,
                custom_fee_rate: None,
                earnings: 0.0,
            })
    }
}

/// In-memory [`WalletStore`].
///
/// Every operation holds the state lock for its whole duration, so the
/// balance check and decrement in [`WalletStore::debit_user_balance`] are
/// a single atomic step.
#[derive(Debug, Clone, Default)]
pub struct MemoryWalletStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryWalletStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a user's wallet balance.
    pub async fn set_user_balance(&self, user_id: UserId, balance: f64) {
        self.state.lock().await.user_mut(user_id).balance = balance;
    }

    /// Sets a user's discount rate.
    pub async fn set_discount_rate(&self, user_id: UserId, rate: Option<f64>) {
        self.state.lock().await.user_mut(user_id).discount_rate = rate;
    }

    /// Registers an advisor with an optional custom platform fee rate.
    pub async fn set_advisor_fee_rate(&self, advisor_id: UserId, rate: Option<f64>) {
        self.state.lock().await.advisor_mut(advisor_id).custom_fee_rate = rate;
    }

    /// Every recorded transaction, oldest first.
    pub async fn all_transactions(&self) -> Vec<Transaction> {
        self.state.lock().await.transactions.clone()
    }
}

#[async_trait]
impl WalletStore for MemoryWalletStore {
    async fn get_user_balance(&self, user_id: UserId) -> AppResult<f64> {
        let state = self.state.lock().await;
        Ok(state.users.get(&user_id).map_or(0.0, |u| u.balance))
    }

    async fn debit_user_balance(&self, user_id: UserId, amount: f64) -> AppResult<Option<f64>> {
        let mut state = self.state.lock().await;
        let account = state.user_mut(user_id);
        if account.balance < amount {
            debug!(user_id = %user_id, amount, balance = account.balance, "Debit refused");
            return Ok(None);
        }
        account.balance -= amount;
        Ok(Some(account.balance))
    }

    async fn credit_user_balance(&self, user_id: UserId, amount: f64) -> AppResult<f64> {
        let mut state = self.state.lock().await;
        let account = state.user_mut(user_id);
        account.balance += amount;
        Ok(account.balance)
    }

    async fn get_user_discount_rate(&self, user_id: UserId) -> AppResult<Option<f64>> {
        let state = self.state.lock().await;
        Ok(state.users.get(&user_id).and_then(|u| u.discount_rate))
    }

    async fn get_advisor(&self, advisor_id: UserId) -> AppResult<Option<AdvisorAccount>> {
        Ok(self.state.lock().await.advisors.get(&advisor_id).cloned())
    }

    async fn credit_advisor_earnings(&self, advisor_id: UserId, amount: f64) -> AppResult<f64> {
        let mut state = self.state.lock().await;
        let advisor = state.advisor_mut(advisor_id);
        advisor.earnings += amount;
        Ok(advisor.earnings)
    }

    async fn create_transaction(&self, transaction: &NewTransaction) -> AppResult<Transaction> {
        let mut state = self.state.lock().await;
        state.next_transaction_id += 1;
        let stored = Transaction {
            id: TransactionId::new(state.next_transaction_id),
            session_id: transaction.session_id,
            user_id: transaction.user_id,
            advisor_id: transaction.advisor_id,
            amount: transaction.amount,
            kind: transaction.kind,
            status: transaction.status,
            method: transaction.method.clone(),
            reason: transaction.reason.clone(),
            created_at: Utc::now(),
        };
        state.transactions.push(stored.clone());
        Ok(stored)
    }

    async fn transactions_by_session(&self, session_id: SessionId) -> AppResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn transactions_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.created_at >= from && t.created_at <= to)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consulthub_entity::wallet::{TransactionKind, TransactionStatus};

    #[tokio::test]
    async fn test_debit_refuses_insufficient_funds() {
        let store = MemoryWalletStore::new();
        let user = UserId::new(1);
        store.set_user_balance(user, 100.0).await;

        assert_eq!(store.debit_user_balance(user, 150.0).await.unwrap(), None);
        assert_eq!(store.debit_user_balance(user, 60.0).await.unwrap(), Some(40.0));
        assert_eq!(store.get_user_balance(user).await.unwrap(), 40.0);
    }

    #[tokio::test]
    async fn test_concurrent_debits_never_overdraw() {
        let store = MemoryWalletStore::new();
        let user = UserId::new(7);
        store.set_user_balance(user, 100.0).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.debit_user_balance(user, 30.0).await.unwrap()
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 3);
        assert_eq!(store.get_user_balance(user).await.unwrap(), 10.0);
    }

    #[tokio::test]
    async fn test_transactions_are_indexed_by_session() {
        let store = MemoryWalletStore::new();
        for session in [1, 1, 2] {
            store
                .create_transaction(&NewTransaction {
                    session_id: SessionId::new(session),
                    user_id: Some(UserId::new(1)),
                    advisor_id: None,
                    amount: 10.0,
                    kind: TransactionKind::Payment,
                    status: TransactionStatus::Completed,
                    method: Some("wallet".to_string()),
                    reason: None,
                })
                .await
                .unwrap();
        }

        let first = store.transactions_by_session(SessionId::new(1)).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].id, TransactionId::new(2));
    }

    #[tokio::test]
    async fn test_advisor_earnings_accumulate() {
        let store = MemoryWalletStore::new();
        let advisor = UserId::new(3);
        store.set_advisor_fee_rate(advisor, Some(0.1)).await;

        store.credit_advisor_earnings(advisor, 90.0).await.unwrap();
        let total = store.credit_advisor_earnings(advisor, 10.0).await.unwrap();
        assert_eq!(total, 100.0);
        assert_eq!(
            store.get_advisor(advisor).await.unwrap().unwrap().custom_fee_rate,
            Some(0.1)
        );
    }
}
