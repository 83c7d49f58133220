use bigdecimal::BigDecimal;
use serde::Serialize;

// Derived view, never persisted: the net position in one stock, replayed
// from the COMPLETED subset of the ledger on every read.
#[derive(Debug, Clone, Serialize)]
pub struct Holding {
    pub stock_code: String,
    pub stock_name: String,
    pub quantity: i64,
    /// Weighted-average acquisition cost; unchanged by sells.
    pub average_buy_price: BigDecimal,
    pub current_price: BigDecimal,
    /// Remaining cost basis: quantity * average_buy_price.
    pub total_invested: BigDecimal,
    pub current_value: BigDecimal,
    pub profit_loss: BigDecimal,
    pub profit_loss_percent: BigDecimal,
}
