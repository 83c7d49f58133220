use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{HistoryFilter, PageParams, TransactionRecord};

/// Append-mostly persistence of ledger entries.
///
/// The store is injected into the engine as a trait object so tests can run
/// against the in-memory implementation instead of Postgres. Implementations
/// must make each `mark_*` call a single atomic write guarded by the expected
/// current status, so a concurrent reader never observes a half-written
/// record.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends a new record (normally in PENDING status).
    async fn insert(&self, record: &TransactionRecord) -> Result<TransactionRecord, AppError>;

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError>;

    /// PENDING -> COMPLETED settlement write; sets balance_after and
    /// executed_at in the same write.
    async fn mark_completed(
        &self,
        id: Uuid,
        balance_after: &BigDecimal,
        executed_at: DateTime<Utc>,
    ) -> Result<TransactionRecord, AppError>;

    /// PENDING -> FAILED, used when the balance write could not be applied.
    async fn mark_failed(&self, id: Uuid) -> Result<TransactionRecord, AppError>;

    /// COMPLETED -> CANCELLED compensation write. Fails with
    /// `InvalidStateTransition` when the record is not currently COMPLETED.
    async fn mark_cancelled(
        &self,
        id: Uuid,
        reason: &str,
        cancelled_at: DateTime<Utc>,
    ) -> Result<TransactionRecord, AppError>;

    /// Filtered history page, newest first.
    async fn fetch_history(
        &self,
        user_id: Uuid,
        filter: &HistoryFilter,
        page: &PageParams,
    ) -> Result<Vec<TransactionRecord>, AppError>;

    async fn count_history(
        &self,
        user_id: Uuid,
        filter: &HistoryFilter,
    ) -> Result<i64, AppError>;

    /// COMPLETED records for one user, ordered by executed_at ascending.
    /// Replay input for holdings and stats.
    async fn fetch_completed_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<TransactionRecord>, AppError>;

    /// COMPLETED records across all users. Replay input for the leaderboard.
    async fn fetch_completed_all(&self) -> Result<Vec<TransactionRecord>, AppError>;
}
