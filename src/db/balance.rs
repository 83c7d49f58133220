use async_trait::async_trait;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::UserSummary;

/// Authoritative cash balance, owned by the external user-profile store.
/// The engine only reads/writes it inside the per-user lock.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    async fn get_balance(&self, user_id: Uuid) -> Result<BigDecimal, AppError>;
    async fn set_balance(&self, user_id: Uuid, value: &BigDecimal) -> Result<(), AppError>;
}

/// Enumeration of known users, used by the ranking aggregator to label the
/// leaderboard and to rank users that have no transactions yet.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserSummary>, AppError>;
}
