//! In-memory implementations of the storage traits.
//!
//! These back the engine in unit and integration tests and are a reference
//! for the atomicity contract: every mutation happens under a single map
//! entry lock, so readers never observe a half-written record.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::db::balance::{BalanceProvider, UserDirectory};
use crate::db::ledger_store::LedgerStore;
use crate::errors::AppError;
use crate::models::{
    HistoryFilter, PageParams, TransactionRecord, TransactionStatus, UserSummary,
};

#[derive(Default)]
pub struct MemoryLedgerStore {
    records: DashMap<Uuid, TransactionRecord>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, user_id: Uuid, filter: &HistoryFilter) -> Vec<TransactionRecord> {
        let code = filter.stock_code.as_deref().map(str::to_uppercase);
        self.records
            .iter()
            .filter(|entry| {
                let r = entry.value();
                r.user_id == user_id
                    && filter
                        .transaction_type
                        .map_or(true, |t| r.transaction_type == t)
                    && code.as_deref().map_or(true, |c| r.stock_code == c)
                    && filter.status.map_or(true, |s| r.status == s)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn update<F>(&self, id: Uuid, apply: F) -> Option<TransactionRecord>
    where
        F: FnOnce(&mut TransactionRecord) -> bool,
    {
        let mut entry = self.records.get_mut(&id)?;
        if apply(entry.value_mut()) {
            Some(entry.value().clone())
        } else {
            None
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert(&self, record: &TransactionRecord) -> Result<TransactionRecord, AppError> {
        self.records.insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>, AppError> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        balance_after: &BigDecimal,
        executed_at: DateTime<Utc>,
    ) -> Result<TransactionRecord, AppError> {
        self.update(id, |r| {
            if r.status != TransactionStatus::Pending {
                return false;
            }
            r.status = TransactionStatus::Completed;
            r.balance_after = Some(balance_after.clone());
            r.executed_at = Some(executed_at);
            r.updated_at = executed_at;
            true
        })
        .ok_or_else(|| {
            AppError::Internal(format!("transaction {} left PENDING state mid-settlement", id))
        })
    }

    async fn mark_failed(&self, id: Uuid) -> Result<TransactionRecord, AppError> {
        self.update(id, |r| {
            if r.status != TransactionStatus::Pending {
                return false;
            }
            r.status = TransactionStatus::Failed;
            r.updated_at = Utc::now();
            true
        })
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
        self.update(id, |r| {
            if r.status != TransactionStatus::Completed {
                return false;
            }
            r.status = TransactionStatus::Cancelled;
            r.cancelled_at = Some(cancelled_at);
            r.cancellation_reason = Some(reason.to_string());
            r.updated_at = cancelled_at;
            true
        })
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
        let mut records = self.matching(user_id, filter);
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let offset = page.offset() as usize;
        Ok(records
            .into_iter()
            .skip(offset)
            .take(page.limit.max(1) as usize)
            .collect())
    }

    async fn count_history(
        &self,
        user_id: Uuid,
        filter: &HistoryFilter,
    ) -> Result<i64, AppError> {
        Ok(self.matching(user_id, filter).len() as i64)
    }

    async fn fetch_completed_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let filter = HistoryFilter {
            status: Some(TransactionStatus::Completed),
            ..Default::default()
        };
        let mut records = self.matching(user_id, &filter);
        records.sort_by_key(|r| r.executed_at);
        Ok(records)
    }

    async fn fetch_completed_all(&self) -> Result<Vec<TransactionRecord>, AppError> {
        let mut records: Vec<TransactionRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().status == TransactionStatus::Completed)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.executed_at);
        Ok(records)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    balances: DashMap<Uuid, BigDecimal>,
    names: DashMap<Uuid, String>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: Uuid, full_name: &str, balance: BigDecimal) {
        self.names.insert(user_id, full_name.to_string());
        self.balances.insert(user_id, balance);
    }
}

#[async_trait]
impl BalanceProvider for MemoryUserStore {
    async fn get_balance(&self, user_id: Uuid) -> Result<BigDecimal, AppError> {
        self.balances
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn set_balance(&self, user_id: Uuid, value: &BigDecimal) -> Result<(), AppError> {
        match self.balances.get_mut(&user_id) {
            Some(mut entry) => {
                *entry.value_mut() = value.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User {} not found", user_id))),
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserStore {
    async fn list_users(&self) -> Result<Vec<UserSummary>, AppError> {
        let mut users: Vec<UserSummary> = self
            .names
            .iter()
            .map(|entry| UserSummary {
                id: *entry.key(),
                full_name: entry.value().clone(),
            })
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}
