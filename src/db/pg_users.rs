use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::balance::{BalanceProvider, UserDirectory};
use crate::errors::AppError;
use crate::models::UserSummary;

/// Balance and directory reads against the users table. The table itself
/// belongs to the profile service; this service only touches the balance
/// column, and only from inside the per-user lock.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BalanceProvider for PgUserStore {
    async fn get_balance(&self, user_id: Uuid) -> Result<BigDecimal, AppError> {
        sqlx::query_scalar::<_, BigDecimal>("SELECT balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn set_balance(&self, user_id: Uuid, value: &BigDecimal) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET balance = $2 WHERE id = $1")
            .bind(user_id)
            .bind(value)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for PgUserStore {
    async fn list_users(&self) -> Result<Vec<UserSummary>, AppError> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT id, full_name FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}
