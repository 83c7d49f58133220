use bigdecimal::BigDecimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::Pagination;

#[derive(Debug, Clone, Serialize)]
pub struct RankedUser {
    /// 1-based, stable across pages.
    pub rank: i64,
    pub user_id: Uuid,
    pub user_full_name: String,
    /// Realized profit: sum of COMPLETED sells minus sum of COMPLETED buys.
    pub total_profit: BigDecimal,
}

#[derive(Debug, Serialize)]
pub struct RankingPage {
    pub ranking: Vec<RankedUser>,
    pub pagination: Pagination,
}
