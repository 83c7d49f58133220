use bigdecimal::BigDecimal;
use serde::Serialize;

/// Per-user transaction totals over COMPLETED records only.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionStats {
    pub current_balance: BigDecimal,
    pub total_buy_transactions: i64,
    pub total_sell_transactions: i64,
    pub total_buy_amount: BigDecimal,
    pub total_sell_amount: BigDecimal,
    pub total_buy_quantity: i64,
    pub total_sell_quantity: i64,
    /// total_sell_amount - total_buy_amount.
    pub net_cash_flow: BigDecimal,
}
