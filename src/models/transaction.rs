use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl TransactionStatus {
    /// CANCELLED and FAILED are terminal; no field may change afterwards.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Cancelled | TransactionStatus::Failed)
    }
}

// One ledger entry. Append-mostly: after creation the only legal transitions
// are PENDING -> COMPLETED/FAILED (settlement) and COMPLETED -> CANCELLED
// (compensation); everything else is immutable audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub stock_code: String,
    pub stock_name: String,
    pub quantity: i64,
    pub price_per_unit: BigDecimal,
    /// Always equals quantity * price_per_unit.
    pub total_amount: BigDecimal,
    pub status: TransactionStatus,
    pub fee_amount: BigDecimal,
    pub commission_amount: BigDecimal,
    /// Balance snapshot taken under the user lock at execution time.
    pub balance_before: BigDecimal,
    /// Present iff status is COMPLETED.
    pub balance_after: Option<BigDecimal>,
    pub notes: Option<String>,
    pub order_id: Option<Uuid>,
    pub executed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(input: &CreateTransaction, total_amount: BigDecimal, balance_before: BigDecimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            transaction_type: input.transaction_type,
            stock_code: input.stock_code.trim().to_uppercase(),
            stock_name: input.stock_name.trim().to_string(),
            quantity: input.quantity,
            price_per_unit: input.price_per_unit.clone(),
            total_amount,
            status: TransactionStatus::Pending,
            fee_amount: BigDecimal::from(0),
            commission_amount: BigDecimal::from(0),
            balance_before,
            balance_after: None,
            notes: input.notes.clone(),
            order_id: input.order_id,
            executed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransaction {
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub stock_code: String,
    pub stock_name: String,
    pub quantity: i64,
    pub price_per_unit: BigDecimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

/// Optional filters for the history endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryFilter {
    pub transaction_type: Option<TransactionType>,
    pub stock_code: Option<String>,
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<TransactionRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageParams {
    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.limit.max(1) as i64
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(params: &PageParams, total: i64) -> Self {
        let limit = params.limit.max(1);
        Self {
            page: params.page.max(1),
            limit,
            total,
            total_pages: (total + limit as i64 - 1) / limit as i64,
        }
    }
}
