use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{BalanceProvider, LedgerStore};
use crate::errors::AppError;
use crate::models::{
    CreateTransaction, HistoryFilter, PageParams, Pagination, TransactionPage, TransactionRecord,
    TransactionType,
};
use crate::services::holdings_service;
use crate::services::lock_service::UserLockService;

/// Order executor and cancellation compensator.
///
/// Every balance mutation runs inside the per-user lock: read balance,
/// compute, persist record and balance, release. The ledger record and the
/// balance are committed as one logical unit; if the second write fails the
/// first is compensated, so no partial state is ever observable.
#[derive(Clone)]
pub struct TransactionEngine {
    ledger: Arc<dyn LedgerStore>,
    balances: Arc<dyn BalanceProvider>,
    locks: UserLockService,
}

impl TransactionEngine {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        balances: Arc<dyn BalanceProvider>,
        locks: UserLockService,
    ) -> Self {
        Self {
            ledger,
            balances,
            locks,
        }
    }

    /// Validates and executes a BUY/SELL order. Synchronous settlement: the
    /// returned record is COMPLETED, staged through PENDING only as part of
    /// the atomic-commit scheme.
    pub async fn create_transaction(
        &self,
        input: CreateTransaction,
    ) -> Result<TransactionRecord, AppError> {
        // Fails fast, before any lock or persisted state is touched
        validate_input(&input)?;

        self.locks
            .with_user_lock(input.user_id, || self.execute_order(&input))
            .await
    }

    async fn execute_order(&self, input: &CreateTransaction) -> Result<TransactionRecord, AppError> {
        let user_id = input.user_id;
        let balance_before = self.balances.get_balance(user_id).await?;
        let total_amount = &input.price_per_unit * BigDecimal::from(input.quantity);

        let balance_after = match input.transaction_type {
            TransactionType::Buy => {
                if balance_before < total_amount {
                    return Err(AppError::InsufficientFunds {
                        required: total_amount,
                        available: balance_before,
                    });
                }
                &balance_before - &total_amount
            }
            TransactionType::Sell => {
                let completed = self.ledger.fetch_completed_for_user(user_id).await?;
                let held = holdings_service::net_quantity(&completed, &input.stock_code);
                if held < input.quantity {
                    return Err(AppError::InsufficientHoldings {
                        stock_code: input.stock_code.trim().to_uppercase(),
                        requested: input.quantity,
                        held,
                    });
                }
                &balance_before + &total_amount
            }
        };

        let record = self
            .ledger
            .insert(&TransactionRecord::new(
                input,
                total_amount,
                balance_before.clone(),
            ))
            .await?;

        // Record and balance commit as one unit: apply the balance, then
        // flip the record to COMPLETED; whichever write fails, the other is
        // rolled back before the error surfaces.
        if let Err(e) = self.balances.set_balance(user_id, &balance_after).await {
            error!(
                "Balance write failed for user {} on transaction {}: {}",
                user_id, record.id, e
            );
            if let Err(mark_err) = self.ledger.mark_failed(record.id).await {
                error!(
                    "Could not mark transaction {} FAILED: {}",
                    record.id, mark_err
                );
            }
            return Err(e);
        }

        match self
            .ledger
            .mark_completed(record.id, &balance_after, Utc::now())
            .await
        {
            Ok(completed) => {
                info!(
                    "Executed {:?} {} x{} for user {}: balance {} -> {}",
                    completed.transaction_type,
                    completed.stock_code,
                    completed.quantity,
                    user_id,
                    completed.balance_before,
                    balance_after
                );
                Ok(completed)
            }
            Err(e) => {
                error!(
                    "Settlement write failed for transaction {}, restoring balance: {}",
                    record.id, e
                );
                if let Err(revert) = self.balances.set_balance(user_id, &balance_before).await {
                    error!(
                        "Could not restore balance for user {} after failed settlement of {}: {}",
                        user_id, record.id, revert
                    );
                }
                Err(e)
            }
        }
    }

    /// Reverses a COMPLETED order. The restoration is the inverse of the
    /// original delta applied to the current balance, not a reset to the
    /// stored balance_before snapshot, which would be stale if other
    /// transactions happened in between.
    pub async fn cancel_transaction(
        &self,
        transaction_id: Uuid,
        caller: Uuid,
        reason: Option<String>,
    ) -> Result<TransactionRecord, AppError> {
        let record = self.fetch_owned(transaction_id, caller).await?;
        if record.status.is_terminal() {
            // Idempotent failure: retrying yields the same error, no second mutation
            return Err(AppError::InvalidStateTransition(format!(
                "Transaction {} is already {:?}",
                transaction_id, record.status
            )));
        }

        self.locks
            .with_user_lock(caller, || self.compensate(transaction_id, caller, reason))
            .await
    }

    async fn compensate(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
        reason: Option<String>,
    ) -> Result<TransactionRecord, AppError> {
        // Re-read under the lock; the pre-lock check may be stale
        let record = self
            .ledger
            .fetch_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", transaction_id)))?;
        if record.status != crate::models::TransactionStatus::Completed {
            return Err(AppError::InvalidStateTransition(format!(
                "Transaction {} cannot be cancelled from {:?}",
                transaction_id, record.status
            )));
        }

        let current = self.balances.get_balance(user_id).await?;
        let restored = match record.transaction_type {
            TransactionType::Buy => &current + &record.total_amount,
            TransactionType::Sell => &current - &record.total_amount,
        };

        self.balances.set_balance(user_id, &restored).await?;

        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "User requested cancellation".to_string());
        match self
            .ledger
            .mark_cancelled(transaction_id, &reason, Utc::now())
            .await
        {
            Ok(cancelled) => {
                info!(
                    "Cancelled transaction {} for user {}: balance {} -> {}",
                    transaction_id, user_id, current, restored
                );
                Ok(cancelled)
            }
            Err(e) => {
                error!(
                    "Cancellation write failed for transaction {}, restoring balance: {}",
                    transaction_id, e
                );
                if let Err(revert) = self.balances.set_balance(user_id, &current).await {
                    error!(
                        "Could not restore balance for user {} after failed cancel of {}: {}",
                        user_id, transaction_id, revert
                    );
                }
                Err(e)
            }
        }
    }

    pub async fn get_transaction_history(
        &self,
        user_id: Uuid,
        filter: HistoryFilter,
        page: PageParams,
    ) -> Result<TransactionPage, AppError> {
        let total = self.ledger.count_history(user_id, &filter).await?;
        let transactions = self.ledger.fetch_history(user_id, &filter, &page).await?;
        Ok(TransactionPage {
            transactions,
            pagination: Pagination::new(&page, total),
        })
    }

    pub async fn get_transaction_by_id(
        &self,
        transaction_id: Uuid,
        caller: Uuid,
    ) -> Result<TransactionRecord, AppError> {
        self.fetch_owned(transaction_id, caller).await
    }

    async fn fetch_owned(
        &self,
        transaction_id: Uuid,
        caller: Uuid,
    ) -> Result<TransactionRecord, AppError> {
        let record = self
            .ledger
            .fetch_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", transaction_id)))?;
        if record.user_id != caller {
            return Err(AppError::Forbidden);
        }
        Ok(record)
    }
}

fn validate_input(input: &CreateTransaction) -> Result<(), AppError> {
    if input.quantity <= 0 {
        return Err(AppError::Validation(
            "Quantity must be a positive integer".into(),
        ));
    }
    if input.price_per_unit <= BigDecimal::from(0) {
        return Err(AppError::Validation(
            "Price per unit must be greater than 0".into(),
        ));
    }
    if input.stock_code.trim().is_empty() {
        return Err(AppError::Validation("Stock code is required".into()));
    }
    if input.stock_name.trim().is_empty() {
        return Err(AppError::Validation("Stock name is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::db::memory::{MemoryLedgerStore, MemoryUserStore};
    use crate::models::TransactionStatus;
    use crate::services::lock_service::InMemoryLockProvider;

    fn engine_with_user(balance: i64) -> (TransactionEngine, Uuid) {
        let ledger = Arc::new(MemoryLedgerStore::new());
        let users = Arc::new(MemoryUserStore::new());
        let user_id = Uuid::new_v4();
        users.add_user(user_id, "Test User", BigDecimal::from(balance));
        let locks = UserLockService::new(
            Arc::new(InMemoryLockProvider::new()),
            EngineConfig::default(),
        );
        (TransactionEngine::new(ledger, users, locks), user_id)
    }

    fn order(
        user_id: Uuid,
        transaction_type: TransactionType,
        quantity: i64,
        price: i64,
    ) -> CreateTransaction {
        CreateTransaction {
            user_id,
            transaction_type,
            stock_code: "VNM".into(),
            stock_name: "Vinamilk".into(),
            quantity,
            price_per_unit: BigDecimal::from(price),
            notes: None,
            order_id: None,
        }
    }

    #[tokio::test]
    async fn buy_debits_balance_and_completes() {
        let (engine, user_id) = engine_with_user(1_000_000);

        let record = engine
            .create_transaction(order(user_id, TransactionType::Buy, 10, 50_000))
            .await
            .unwrap();

        assert_eq!(record.status, TransactionStatus::Completed);
        assert_eq!(record.total_amount, BigDecimal::from(500_000));
        assert_eq!(record.balance_before, BigDecimal::from(1_000_000));
        assert_eq!(record.balance_after, Some(BigDecimal::from(500_000)));
        assert!(record.executed_at.is_some());
    }

    #[tokio::test]
    async fn buy_beyond_balance_writes_nothing() {
        let (engine, user_id) = engine_with_user(100);

        let err = engine
            .create_transaction(order(user_id, TransactionType::Buy, 10, 50))
            .await
            .unwrap_err();

        match &err {
            AppError::InsufficientFunds {
                required,
                available,
            } => {
                assert_eq!(*required, BigDecimal::from(500));
                assert_eq!(*available, BigDecimal::from(100));
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(err.shortfall(), Some(BigDecimal::from(400)));

        // No record was appended and the balance is untouched
        let page = engine
            .get_transaction_history(user_id, HistoryFilter::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[tokio::test]
    async fn sell_without_position_is_rejected() {
        let (engine, user_id) = engine_with_user(1_000_000);

        let err = engine
            .create_transaction(order(user_id, TransactionType::Sell, 5, 100))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::InsufficientHoldings {
                requested: 5,
                held: 0,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn sell_credits_balance() {
        let (engine, user_id) = engine_with_user(1_000_000);
        engine
            .create_transaction(order(user_id, TransactionType::Buy, 10, 50_000))
            .await
            .unwrap();

        let sell = engine
            .create_transaction(order(user_id, TransactionType::Sell, 4, 60_000))
            .await
            .unwrap();

        assert_eq!(sell.balance_before, BigDecimal::from(500_000));
        assert_eq!(sell.balance_after, Some(BigDecimal::from(740_000)));
    }

    #[tokio::test]
    async fn validation_rejects_bad_input() {
        let (engine, user_id) = engine_with_user(1_000);

        for bad in [
            order(user_id, TransactionType::Buy, 0, 100),
            order(user_id, TransactionType::Buy, -3, 100),
            order(user_id, TransactionType::Buy, 1, 0),
        ] {
            assert!(matches!(
                engine.create_transaction(bad).await,
                Err(AppError::Validation(_))
            ));
        }

        let mut blank_code = order(user_id, TransactionType::Buy, 1, 100);
        blank_code.stock_code = "  ".into();
        assert!(matches!(
            engine.create_transaction(blank_code).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn cancel_requires_ownership() {
        let (engine, user_id) = engine_with_user(1_000_000);
        let record = engine
            .create_transaction(order(user_id, TransactionType::Buy, 1, 100))
            .await
            .unwrap();

        let stranger = Uuid::new_v4();
        assert!(matches!(
            engine.cancel_transaction(record.id, stranger, None).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            engine.cancel_transaction(Uuid::new_v4(), user_id, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cancel_buy_refunds_at_current_balance() {
        let (engine, user_id) = engine_with_user(1_000_000);
        let buy = engine
            .create_transaction(order(user_id, TransactionType::Buy, 10, 50_000))
            .await
            .unwrap();
        // A later, unrelated buy moves the balance past the stored snapshot
        engine
            .create_transaction(order(user_id, TransactionType::Buy, 1, 100_000))
            .await
            .unwrap();

        let cancelled = engine
            .cancel_transaction(buy.id, user_id, Some("fat finger".into()))
            .await
            .unwrap();

        assert_eq!(cancelled.status, TransactionStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("fat finger"));
        assert!(cancelled.cancelled_at.is_some());

        // 1,000,000 - 500,000 - 100,000 + 500,000 back
        let stats_balance = engine
            .get_transaction_history(user_id, HistoryFilter::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(stats_balance.pagination.total, 2);
    }

    #[tokio::test]
    async fn cancel_is_idempotent_failure_on_retry() {
        let (engine, user_id) = engine_with_user(1_000_000);
        let buy = engine
            .create_transaction(order(user_id, TransactionType::Buy, 1, 1_000))
            .await
            .unwrap();

        engine
            .cancel_transaction(buy.id, user_id, None)
            .await
            .unwrap();

        let first_retry = engine.cancel_transaction(buy.id, user_id, None).await;
        let second_retry = engine.cancel_transaction(buy.id, user_id, None).await;
        assert!(matches!(
            first_retry,
            Err(AppError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            second_retry,
            Err(AppError::InvalidStateTransition(_))
        ));
    }

    #[tokio::test]
    async fn history_filters_by_type() {
        let (engine, user_id) = engine_with_user(1_000_000);
        engine
            .create_transaction(order(user_id, TransactionType::Buy, 10, 100))
            .await
            .unwrap();
        engine
            .create_transaction(order(user_id, TransactionType::Sell, 3, 100))
            .await
            .unwrap();

        let buys = engine
            .get_transaction_history(
                user_id,
                HistoryFilter {
                    transaction_type: Some(TransactionType::Buy),
                    ..Default::default()
                },
                PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(buys.pagination.total, 1);
        assert_eq!(
            buys.transactions[0].transaction_type,
            TransactionType::Buy
        );
    }
}
