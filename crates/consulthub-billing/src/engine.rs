//! Billing engine: cost, payments, refunds, payouts and reports.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use consulthub_core::config::BillingConfig;
use consulthub_core::error::AppError;
use consulthub_core::result::AppResult;
use consulthub_core::types::{SessionId, ceil_minutes, round_currency};
use consulthub_entity::wallet::{NewTransaction, Transaction, TransactionKind, TransactionStatus};
use consulthub_storage::WalletStore;

use crate::metrics::BillingCounters;
use crate::types::{
    BillingMetrics, BillingReport, BillingResult, BillingState, BillingStatus, CostBreakdown,
    DateRange, PaymentRequest, PaymentResult, PayoutRequest, PayoutResult, PayoutTransfer,
    RefundRequest, SessionBillingData,
};
use crate::validation::{is_valid_amount, validate_billing_data, validate_payout};

/// Computes session charges and moves money through the wallet store.
pub struct BillingEngine {
    wallet: Arc<dyn WalletStore>,
    config: BillingConfig,
    counters: BillingCounters,
}

impl fmt::Debug for BillingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BillingEngine")
            .field("config", &self.config)
            .field("counters", &self.counters)
            .finish()
    }
}

impl BillingEngine {
    /// Create a new billing engine.
    pub fn new(wallet: Arc<dyn WalletStore>, config: BillingConfig) -> Self {
        Self {
            wallet,
            config,
            counters: BillingCounters::new(),
        }
    }

    /// Payment method recorded on session charges.
    pub fn payment_method(&self) -> &str {
        &self.config.payment_method
    }

    /// Calculate the cost of a session.
    ///
    /// Billing is per started minute with a one minute floor. The user's
    /// discount rate is only looked up when a paying user is given.
    pub async fn calculate_cost(&self, data: &SessionBillingData) -> AppResult<BillingResult> {
        validate_billing_data(data)?;

        let minutes = ceil_minutes(data.start_time, data.end_time).max(1);
        let is_free = data.rate_per_minute == 0.0
            || data.session_type.is_some_and(|kind| kind.is_free());

        if is_free {
            debug!(session_id = %data.session_id, minutes, "Free session");
            return Ok(BillingResult {
                duration: minutes,
                cost: 0.0,
                breakdown: CostBreakdown {
                    base_rate: 0.0,
                    minutes,
                    total: 0.0,
                    discount: None,
                },
                is_free: true,
            });
        }

        let gross = minutes as f64 * data.rate_per_minute;
        let discount = match data.user_id {
            Some(user_id) => self
                .wallet
                .get_user_discount_rate(user_id)
                .await?
                .filter(|rate| *rate > 0.0)
                .map(|rate| round_currency(gross * rate.min(1.0))),
            None => None,
        };
        let cost = round_currency(gross - discount.unwrap_or(0.0));

        debug!(
            session_id = %data.session_id,
            minutes,
            rate = data.rate_per_minute,
            cost,
            "Session cost calculated"
        );

        Ok(BillingResult {
            duration: minutes,
            cost,
            breakdown: CostBreakdown {
                base_rate: data.rate_per_minute,
                minutes,
                total: cost,
                discount,
            },
            is_free: false,
        })
    }

    /// Charge a user's wallet for a session.
    ///
    /// The debit is a single conditional update; the ledger entry is written
    /// afterwards and the debit is reversed if recording fails.
    pub async fn process_payment(&self, request: &PaymentRequest) -> PaymentResult {
        self.counters.payment_attempted();

        if !request.session_id.is_valid()
            || !request.user_id.is_valid()
            || !is_valid_amount(request.amount)
        {
            return PaymentResult::failed("Invalid payment data");
        }
        let amount = round_currency(request.amount);

        match self.wallet.debit_user_balance(request.user_id, amount).await {
            Ok(Some(balance)) => {
                debug!(user_id = %request.user_id, amount, balance, "Wallet debited");
            }
            Ok(None) => {
                warn!(
                    session_id = %request.session_id,
                    user_id = %request.user_id,
                    amount,
                    "Payment refused: insufficient funds"
                );
                return PaymentResult::failed("Insufficient funds");
            }
            Err(e) => {
                error!(session_id = %request.session_id, error = %e, "Wallet debit failed");
                return PaymentResult::failed(e.message);
            }
        }

        let transaction = NewTransaction {
            session_id: request.session_id,
            user_id: Some(request.user_id),
            advisor_id: None,
            amount,
            kind: TransactionKind::Payment,
            status: TransactionStatus::Completed,
            method: Some(request.payment_method.clone()),
            reason: None,
        };

        match self.wallet.create_transaction(&transaction).await {
            Ok(recorded) => {
                self.counters.payment_succeeded(amount);
                info!(
                    session_id = %request.session_id,
                    user_id = %request.user_id,
                    transaction_id = %recorded.id,
                    amount,
                    "Payment processed"
                );
                PaymentResult::completed(recorded.id, amount)
            }
            Err(e) => {
                error!(session_id = %request.session_id, error = %e, "Failed to record payment");
                if let Err(credit_err) = self
                    .wallet
                    .credit_user_balance(request.user_id, amount)
                    .await
                {
                    error!(
                        user_id = %request.user_id,
                        amount,
                        error = %credit_err,
                        "Failed to reverse wallet debit"
                    );
                }
                PaymentResult::failed(e.message)
            }
        }
    }

    /// Return money to a user's wallet.
    pub async fn process_refund(&self, request: &RefundRequest) -> PaymentResult {
        if !request.session_id.is_valid()
            || !request.user_id.is_valid()
            || !is_valid_amount(request.amount)
        {
            return PaymentResult::failed("Invalid refund data");
        }
        let amount = round_currency(request.amount);

        let transaction = NewTransaction {
            session_id: request.session_id,
            user_id: Some(request.user_id),
            advisor_id: None,
            amount,
            kind: TransactionKind::Refund,
            status: TransactionStatus::Completed,
            method: None,
            reason: Some(request.reason.clone()),
        };

        let recorded = match self.wallet.create_transaction(&transaction).await {
            Ok(recorded) => recorded,
            Err(e) => {
                error!(session_id = %request.session_id, error = %e, "Failed to record refund");
                return PaymentResult::failed(e.message);
            }
        };

        if let Err(e) = self
            .wallet
            .credit_user_balance(request.user_id, amount)
            .await
        {
            error!(
                session_id = %request.session_id,
                transaction_id = %recorded.id,
                error = %e,
                "Failed to credit refund"
            );
            return PaymentResult::failed(e.message);
        }

        info!(
            session_id = %request.session_id,
            user_id = %request.user_id,
            amount,
            reason = %request.reason,
            "Refund processed"
        );
        PaymentResult::completed(recorded.id, amount)
    }

    /// Fold a session's ledger into its billing status.
    pub async fn get_billing_status(&self, session_id: SessionId) -> AppResult<BillingStatus> {
        let transactions = self.wallet.transactions_by_session(session_id).await?;
        Ok(fold_status(transactions))
    }

    /// Split a session's gross amount between the platform and the advisor.
    ///
    /// An advisor's custom fee rate wins over the requested or configured one.
    pub async fn calculate_payout(&self, request: &PayoutRequest) -> AppResult<PayoutResult> {
        validate_payout(request)?;

        let custom_rate = self
            .wallet
            .get_advisor(request.advisor_id)
            .await?
            .and_then(|advisor| advisor.custom_fee_rate)
            .filter(|rate| *rate > 0.0);
        let fee_rate = custom_rate
            .or(request.platform_fee)
            .unwrap_or(self.config.platform_fee_rate);

        let platform_fee = round_currency(request.total_amount * fee_rate);
        let net_amount = round_currency(request.total_amount - platform_fee);

        Ok(PayoutResult {
            gross_amount: request.total_amount,
            platform_fee,
            net_amount,
            fee_percentage: (fee_rate * 100.0).round() as i64,
        })
    }

    /// Record a payout and credit the advisor's earnings.
    pub async fn process_payout(&self, transfer: &PayoutTransfer) -> PaymentResult {
        if !transfer.advisor_id.is_valid() || !is_valid_amount(transfer.amount) {
            return PaymentResult::failed("Invalid payout data");
        }
        let amount = round_currency(transfer.amount);
        let method = transfer
            .payout_method
            .clone()
            .unwrap_or_else(|| self.config.payout_method.clone());

        let transaction = NewTransaction {
            session_id: transfer.session_id,
            user_id: None,
            advisor_id: Some(transfer.advisor_id),
            amount,
            kind: TransactionKind::Payout,
            status: TransactionStatus::Completed,
            method: Some(method),
            reason: None,
        };

        let recorded = match self.wallet.create_transaction(&transaction).await {
            Ok(recorded) => recorded,
            Err(e) => {
                error!(advisor_id = %transfer.advisor_id, error = %e, "Failed to record payout");
                return PaymentResult::failed(e.message);
            }
        };

        match self
            .wallet
            .credit_advisor_earnings(transfer.advisor_id, amount)
            .await
        {
            Ok(earnings) => {
                info!(
                    advisor_id = %transfer.advisor_id,
                    session_id = %transfer.session_id,
                    amount,
                    earnings,
                    "Payout processed"
                );
                PaymentResult::completed(recorded.id, amount)
            }
            Err(e) => {
                error!(advisor_id = %transfer.advisor_id, error = %e, "Failed to credit earnings");
                PaymentResult::failed(e.message)
            }
        }
    }

    /// Revenue over a date range, from completed transactions only.
    pub async fn report(&self, range: &DateRange) -> AppResult<BillingReport> {
        if range.end_date < range.start_date {
            return Err(AppError::validation("Invalid date range"));
        }

        let transactions = self
            .wallet
            .transactions_between(range.start_date, range.end_date)
            .await?;

        let mut total_revenue = 0.0;
        let mut total_refunds = 0.0;
        let mut transaction_count = 0u64;
        for transaction in transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed)
        {
            match transaction.kind {
                TransactionKind::Payment => total_revenue += transaction.amount,
                TransactionKind::Refund => total_refunds += transaction.amount,
                TransactionKind::Payout => {}
            }
            transaction_count += 1;
        }

        Ok(BillingReport {
            total_revenue: round_currency(total_revenue),
            total_refunds: round_currency(total_refunds),
            net_revenue: round_currency(total_revenue - total_refunds),
            transaction_count,
        })
    }

    /// Running payment metrics.
    pub fn metrics(&self) -> BillingMetrics {
        self.counters.snapshot()
    }
}

fn fold_status(transactions: Vec<Transaction>) -> BillingStatus {
    let mut paid = 0.0;
    let mut refunded = 0.0;
    let mut pending = 0.0;
    let mut has_dispute = false;

    for transaction in &transactions {
        if transaction.status == TransactionStatus::Disputed {
            has_dispute = true;
        }
        match (transaction.kind, transaction.status) {
            (TransactionKind::Payment, TransactionStatus::Completed) => paid += transaction.amount,
            (TransactionKind::Payment, TransactionStatus::Pending) => {
                pending += transaction.amount
            }
            (TransactionKind::Refund, TransactionStatus::Completed) => {
                refunded += transaction.amount
            }
            _ => {}
        }
    }

    let status = if has_dispute {
        BillingState::Disputed
    } else if pending > 0.0 || transactions.is_empty() {
        BillingState::Pending
    } else if paid > 0.0 && refunded >= paid {
        BillingState::Refunded
    } else {
        BillingState::Completed
    };

    BillingStatus {
        status,
        total_amount: round_currency(paid - refunded),
        pending_amount: (pending > 0.0).then(|| round_currency(pending)),
        has_dispute,
        transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use consulthub_core::types::UserId;
    use consulthub_entity::session::SessionType;
    use consulthub_entity::wallet::AdvisorAccount;
    use consulthub_storage::MemoryWalletStore;

    const SESSION: SessionId = SessionId::new(1);
    const ADVISOR: UserId = UserId::new(2);
    const CLIENT: UserId = UserId::new(3);

    fn engine(store: &MemoryWalletStore) -> BillingEngine {
        BillingEngine::new(Arc::new(store.clone()), BillingConfig::default())
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    fn billing_data(rate: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> SessionBillingData {
        SessionBillingData {
            session_id: SESSION,
            advisor_id: ADVISOR,
            user_id: None,
            start_time: start,
            end_time: end,
            rate_per_minute: rate,
            session_type: Some(SessionType::Video),
        }
    }

    fn payment(amount: f64) -> PaymentRequest {
        PaymentRequest {
            session_id: SESSION,
            user_id: CLIENT,
            amount,
            payment_method: "wallet".to_string(),
        }
    }

    #[tokio::test]
    async fn test_partial_minutes_round_up() {
        let store = MemoryWalletStore::new();
        let result = engine(&store)
            .calculate_cost(&billing_data(2.5, at(10, 0, 0), at(10, 2, 30)))
            .await
            .unwrap();

        assert_eq!(result.duration, 3);
        assert_eq!(result.cost, 7.5);
        assert!(!result.is_free);
        assert_eq!(result.breakdown.base_rate, 2.5);
        assert_eq!(result.breakdown.discount, None);
    }

    #[tokio::test]
    async fn test_minimum_one_minute() {
        let store = MemoryWalletStore::new();
        let start = at(9, 0, 0);
        let result = engine(&store)
            .calculate_cost(&billing_data(4.0, start, start + Duration::milliseconds(1)))
            .await
            .unwrap();
        assert_eq!(result.duration, 1);
        assert_eq!(result.cost, 4.0);
    }

    #[tokio::test]
    async fn test_free_sessions_cost_nothing() {
        let store = MemoryWalletStore::new();
        let engine = engine(&store);

        let zero_rate = engine
            .calculate_cost(&billing_data(0.0, at(10, 0, 0), at(10, 30, 0)))
            .await
            .unwrap();
        assert!(zero_rate.is_free);
        assert_eq!(zero_rate.cost, 0.0);
        assert_eq!(zero_rate.duration, 30);

        let mut data = billing_data(5.0, at(10, 0, 0), at(10, 30, 0));
        data.session_type = Some(SessionType::FreeConsultation);
        let consultation = engine.calculate_cost(&data).await.unwrap();
        assert!(consultation.is_free);
        assert_eq!(consultation.cost, 0.0);
        assert_eq!(consultation.breakdown.base_rate, 0.0);
    }

    #[tokio::test]
    async fn test_discount_applies_only_with_user() {
        let store = MemoryWalletStore::new();
        store.set_discount_rate(CLIENT, Some(0.1)).await;
        let engine = engine(&store);

        let mut data = billing_data(3.33, at(10, 0, 0), at(10, 3, 0));
        let anonymous = engine.calculate_cost(&data).await.unwrap();
        assert_eq!(anonymous.cost, 9.99);

        data.user_id = Some(CLIENT);
        let discounted = engine.calculate_cost(&data).await.unwrap();
        assert_eq!(discounted.breakdown.discount, Some(1.0));
        assert_eq!(discounted.cost, 8.99);
    }

    #[tokio::test]
    async fn test_invalid_data_is_rejected() {
        let store = MemoryWalletStore::new();
        let engine = engine(&store);

        let err = engine
            .calculate_cost(&billing_data(1.0, at(10, 0, 0), at(10, 0, 0)))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = engine
            .calculate_cost(&billing_data(-1.0, at(10, 0, 0), at(10, 1, 0)))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_payment_debits_and_records() {
        let store = MemoryWalletStore::new();
        store.set_user_balance(CLIENT, 50.0).await;
        let engine = engine(&store);

        let result = engine.process_payment(&payment(12.5)).await;
        assert!(result.success);
        assert_eq!(result.amount, Some(12.5));
        assert!(result.transaction_id.is_some());
        assert_eq!(store.get_user_balance(CLIENT).await.unwrap(), 37.5);

        let ledger = store.all_transactions().await;
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, TransactionKind::Payment);
        assert_eq!(ledger[0].method.as_deref(), Some("wallet"));
    }

    #[tokio::test]
    async fn test_insufficient_funds() {
        let store = MemoryWalletStore::new();
        store.set_user_balance(CLIENT, 5.0).await;
        let engine = engine(&store);

        let result = engine.process_payment(&payment(12.5)).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Insufficient funds"));
        assert_eq!(store.get_user_balance(CLIENT).await.unwrap(), 5.0);
        assert!(store.all_transactions().await.is_empty());
        assert_eq!(engine.metrics().success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_failed_recording_reverses_debit() {
        let store = MemoryWalletStore::new();
        store.set_user_balance(CLIENT, 20.0).await;
        let engine = BillingEngine::new(
            Arc::new(LedgerDown {
                inner: store.clone(),
            }),
            BillingConfig::default(),
        );

        let result = engine.process_payment(&payment(10.0)).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("ledger unavailable"));
        assert_eq!(store.get_user_balance(CLIENT).await.unwrap(), 20.0);
    }

    #[tokio::test]
    async fn test_refund_credits_wallet() {
        let store = MemoryWalletStore::new();
        store.set_user_balance(CLIENT, 10.0).await;
        let engine = engine(&store);

        let result = engine
            .process_refund(&RefundRequest {
                session_id: SESSION,
                user_id: CLIENT,
                amount: 4.0,
                reason: "call dropped".to_string(),
            })
            .await;
        assert!(result.success);
        assert_eq!(store.get_user_balance(CLIENT).await.unwrap(), 14.0);

        let ledger = store.all_transactions().await;
        assert_eq!(ledger[0].kind, TransactionKind::Refund);
        assert_eq!(ledger[0].reason.as_deref(), Some("call dropped"));
    }

    #[tokio::test]
    async fn test_billing_status_fold() {
        let store = MemoryWalletStore::new();
        store.set_user_balance(CLIENT, 100.0).await;
        let engine = engine(&store);

        assert_eq!(
            engine.get_billing_status(SESSION).await.unwrap().status,
            BillingState::Pending
        );

        engine.process_payment(&payment(30.0)).await;
        let status = engine.get_billing_status(SESSION).await.unwrap();
        assert_eq!(status.status, BillingState::Completed);
        assert_eq!(status.total_amount, 30.0);
        assert_eq!(status.pending_amount, None);

        engine
            .process_refund(&RefundRequest {
                session_id: SESSION,
                user_id: CLIENT,
                amount: 30.0,
                reason: "advisor no-show".to_string(),
            })
            .await;
        let status = engine.get_billing_status(SESSION).await.unwrap();
        assert_eq!(status.status, BillingState::Refunded);
        assert_eq!(status.total_amount, 0.0);
        assert_eq!(status.transactions.len(), 2);
    }

    #[tokio::test]
    async fn test_billing_status_dispute_and_pending() {
        let store = MemoryWalletStore::new();
        let engine = engine(&store);
        let other = SessionId::new(9);

        let mut entry = NewTransaction {
            session_id: other,
            user_id: Some(CLIENT),
            advisor_id: None,
            amount: 8.0,
            kind: TransactionKind::Payment,
            status: TransactionStatus::Pending,
            method: None,
            reason: None,
        };
        store.create_transaction(&entry).await.unwrap();
        let status = engine.get_billing_status(other).await.unwrap();
        assert_eq!(status.status, BillingState::Pending);
        assert_eq!(status.pending_amount, Some(8.0));

        entry.status = TransactionStatus::Disputed;
        store.create_transaction(&entry).await.unwrap();
        let status = engine.get_billing_status(other).await.unwrap();
        assert_eq!(status.status, BillingState::Disputed);
        assert!(status.has_dispute);
    }

    #[tokio::test]
    async fn test_payout_uses_default_or_custom_rate() {
        let store = MemoryWalletStore::new();
        let engine = engine(&store);
        let request = PayoutRequest {
            session_id: SESSION,
            advisor_id: ADVISOR,
            total_amount: 99.99,
            platform_fee: None,
        };

        let payout = engine.calculate_payout(&request).await.unwrap();
        assert_eq!(payout.platform_fee, 20.0);
        assert_eq!(payout.net_amount, 79.99);
        assert_eq!(payout.fee_percentage, 20);

        store.set_advisor_fee_rate(ADVISOR, Some(0.15)).await;
        let payout = engine
            .calculate_payout(&PayoutRequest {
                platform_fee: Some(0.3),
                ..request
            })
            .await
            .unwrap();
        assert_eq!(payout.fee_percentage, 15);
        assert_eq!(payout.platform_fee, 15.0);
        assert_eq!(payout.net_amount, 84.99);
    }

    #[tokio::test]
    async fn test_process_payout_credits_earnings() {
        let store = MemoryWalletStore::new();
        let engine = engine(&store);

        let result = engine
            .process_payout(&PayoutTransfer {
                advisor_id: ADVISOR,
                session_id: SESSION,
                amount: 40.0,
                payout_method: None,
            })
            .await;
        assert!(result.success);

        let advisor = store.get_advisor(ADVISOR).await.unwrap().unwrap();
        assert_eq!(advisor.earnings, 40.0);
        let ledger = store.all_transactions().await;
        assert_eq!(ledger[0].kind, TransactionKind::Payout);
        assert_eq!(ledger[0].method.as_deref(), Some("bank_transfer"));
    }

    #[tokio::test]
    async fn test_report_counts_completed_only() {
        let store = MemoryWalletStore::new();
        store.set_user_balance(CLIENT, 100.0).await;
        let engine = engine(&store);

        engine.process_payment(&payment(25.0)).await;
        engine.process_payment(&payment(15.0)).await;
        engine
            .process_refund(&RefundRequest {
                session_id: SESSION,
                user_id: CLIENT,
                amount: 5.0,
                reason: "partial".to_string(),
            })
            .await;
        store
            .create_transaction(&NewTransaction {
                session_id: SESSION,
                user_id: Some(CLIENT),
                advisor_id: None,
                amount: 70.0,
                kind: TransactionKind::Payment,
                status: TransactionStatus::Failed,
                method: None,
                reason: None,
            })
            .await
            .unwrap();

        let now = Utc::now();
        let report = engine
            .report(&DateRange {
                start_date: now - Duration::hours(1),
                end_date: now + Duration::hours(1),
            })
            .await
            .unwrap();
        assert_eq!(report.total_revenue, 40.0);
        assert_eq!(report.total_refunds, 5.0);
        assert_eq!(report.net_revenue, 35.0);
        assert_eq!(report.transaction_count, 3);

        let metrics = engine.metrics();
        assert_eq!(metrics.total_processed_amount, 40.0);
        assert_eq!(metrics.average_session_cost, 20.0);
        assert_eq!(metrics.success_rate, 100.0);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let json = serde_json::to_value(BillingResult {
            duration: 2,
            cost: 0.0,
            breakdown: CostBreakdown {
                base_rate: 0.0,
                minutes: 2,
                total: 0.0,
                discount: None,
            },
            is_free: true,
        })
        .unwrap();
        assert_eq!(json["isFree"], true);
        assert_eq!(json["breakdown"]["baseRate"], 0.0);
        assert!(json["breakdown"].get("discount").is_none());
    }

    /// Wallet whose ledger writes always fail.
    struct LedgerDown {
        inner: MemoryWalletStore,
    }

    #[async_trait]
    impl WalletStore for LedgerDown {
        async fn get_user_balance(&self, user_id: UserId) -> AppResult<f64> {
            self.inner.get_user_balance(user_id).await
        }

        async fn debit_user_balance(&self, user_id: UserId, amount: f64) -> AppResult<Option<f64>> {
            self.inner.debit_user_balance(user_id, amount).await
        }

        async fn credit_user_balance(&self, user_id: UserId, amount: f64) -> AppResult<f64> {
            self.inner.credit_user_balance(user_id, amount).await
        }

        async fn get_user_discount_rate(&self, user_id: UserId) -> AppResult<Option<f64>> {
            self.inner.get_user_discount_rate(user_id).await
        }

        async fn get_advisor(&self, advisor_id: UserId) -> AppResult<Option<AdvisorAccount>> {
            self.inner.get_advisor(advisor_id).await
        }

        async fn credit_advisor_earnings(&self, advisor_id: UserId, amount: f64) -> AppResult<f64> {
            self.inner.credit_advisor_earnings(advisor_id, amount).await
        }

        async fn create_transaction(&self, _transaction: &NewTransaction) -> AppResult<Transaction> {
            Err(AppError::database("ledger unavailable"))
        }

        async fn transactions_by_session(&self, session_id: SessionId) -> AppResult<Vec<Transaction>> {
            self.inner.transactions_by_session(session_id).await
        }

        async fn transactions_between(
            &self,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> AppResult<Vec<Transaction>> {
            self.inner.transactions_between(from, to).await
        }
    }
}
