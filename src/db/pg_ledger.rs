use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::ledger_store::LedgerStore;
use crate::errors::AppError;
use crate::models::{HistoryFilter, PageParams, TransactionRecord, TransactionStatus};

const HISTORY_WHERE: &str = "user_id = $1
       AND ($2::transaction_type IS NULL OR transaction_type = $2)
       AND ($3::text IS NULL OR stock_code = $3)
       AND ($4::transaction_status IS NULL OR status = $4)";

/// Postgres-backed ledger. Every status transition is a single guarded
/// UPDATE, so a row is never visible in a half-written state.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn insert(&self, record: &TransactionRecord) -> Result<TransactionRecord, AppError> {
        let inserted = sqlx::query_as::<_, TransactionRecord>(
            "INSERT INTO stock_transactions
                (id, user_id, transaction_type, stock_code, stock_name, quantity,
                 price_per_unit, total_amount, status, fee_amount, commission_amount,
                 balance_before, balance_after, notes, order_id, executed_at,
                 cancelled_at, cancellation_reason, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                     $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
             RETURNING *",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.transaction_type)
        .bind(&record.stock_code)
        .bind(&record.stock_name)
        .bind(record.quantity)
        .bind(&record.price_per_unit)
        .bind(&record.total_amount)
        .bind(record.status)
        .bind(&record.fee_amount)
        .bind(&record.commission_amount)
        .bind(&record.balance_before)
        .bind(&record.balance_after)
        .bind(&record.notes)
        .bind(record.order_id)
        .bind(record.executed_at)
        .bind(record.cancelled_at)
        .bind(&record.cancellation_reason)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM stock_transactions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        balance_after: &BigDecimal,
        executed_at: DateTime<Utc>,
    ) -> Result<TransactionRecord, AppError> {
        sqlx::query_as::<_, TransactionRecord>(
            "UPDATE stock_transactions
             SET status = 'COMPLETED', balance_after = $2, executed_at = $3, updated_at = $3
             WHERE id = $1 AND status = 'PENDING'
             RETURNING *",
        )
        .bind(id)
        .bind(balance_after)
        .bind(executed_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::Internal(format!("transaction {} left PENDING state mid-settlement", id))
        })
    }

    async fn mark_failed(&self, id: Uuid) -> Result<TransactionRecord, AppError> {
        sqlx::query_as::<_, TransactionRecord>(
            "UPDATE stock_transactions
             SET status = 'FAILED', updated_at = now()
             WHERE id = $1 AND status = 'PENDING'
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::Internal(format!("transaction {} left PENDING state mid-settlement", id))
        })
    }

    async fn mark_cancelled(
        &self,
        id: Uuid,
        reason: &str,
        cancelled_at: DateTime<Utc>,
    ) -> Result<TransactionRecord, AppError> {
        sqlx::query_as::<_, TransactionRecord>(
            "UPDATE stock_transactions
             SET status = 'CANCELLED', cancelled_at = $2, cancellation_reason = $3,
                 updated_at = $2
             WHERE id = $1 AND status = 'COMPLETED'
             RETURNING *",
        )
        .bind(id)
        .bind(cancelled_at)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition(format!(
                "transaction {} is not in a cancellable state",
                id
            ))
        })
    }

    async fn fetch_history(
        &self,
        user_id: Uuid,
        filter: &HistoryFilter,
        page: &PageParams,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let sql = format!(
            "SELECT * FROM stock_transactions
             WHERE {HISTORY_WHERE}
             ORDER BY created_at DESC
             LIMIT $5 OFFSET $6"
        );
        let records = sqlx::query_as::<_, TransactionRecord>(&sql)
            .bind(user_id)
            .bind(filter.transaction_type)
            .bind(filter.stock_code.as_deref().map(str::to_uppercase))
            .bind(filter.status)
            .bind(page.limit.max(1) as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn count_history(
        &self,
        user_id: Uuid,
        filter: &HistoryFilter,
    ) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM stock_transactions WHERE {HISTORY_WHERE}");
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(filter.transaction_type)
            .bind(filter.stock_code.as_deref().map(str::to_uppercase))
            .bind(filter.status)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn fetch_completed_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM stock_transactions
             WHERE user_id = $1 AND status = $2
             ORDER BY executed_at ASC",
        )
        .bind(user_id)
        .bind(TransactionStatus::Completed)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn fetch_completed_all(&self) -> Result<Vec<TransactionRecord>, AppError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM stock_transactions
             WHERE status = $1
             ORDER BY executed_at ASC",
        )
        .bind(TransactionStatus::Completed)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
