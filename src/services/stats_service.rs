use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::db::{BalanceProvider, LedgerStore};
use crate::errors::AppError;
use crate::models::{TransactionRecord, TransactionStats, TransactionType};

/// Counts and totals over a user's COMPLETED records, plus the live balance.
pub async fn get_user_transaction_stats(
    ledger: &dyn LedgerStore,
    balances: &dyn BalanceProvider,
    user_id: Uuid,
) -> Result<TransactionStats, AppError> {
    let current_balance = balances.get_balance(user_id).await?;
    let records = ledger.fetch_completed_for_user(user_id).await?;
    Ok(summarize(&records, current_balance))
}

fn summarize(records: &[TransactionRecord], current_balance: BigDecimal) -> TransactionStats {
    let mut stats = TransactionStats {
        current_balance,
        total_buy_transactions: 0,
        total_sell_transactions: 0,
        total_buy_amount: BigDecimal::from(0),
        total_sell_amount: BigDecimal::from(0),
        total_buy_quantity: 0,
        total_sell_quantity: 0,
        net_cash_flow: BigDecimal::from(0),
    };

    for record in records {
        match record.transaction_type {
            TransactionType::Buy => {
                stats.total_buy_transactions += 1;
                stats.total_buy_amount = &stats.total_buy_amount + &record.total_amount;
                stats.total_buy_quantity += record.quantity;
            }
            TransactionType::Sell => {
                stats.total_sell_transactions += 1;
                stats.total_sell_amount = &stats.total_sell_amount + &record.total_amount;
                stats.total_sell_quantity += record.quantity;
            }
        }
    }

    stats.net_cash_flow = &stats.total_sell_amount - &stats.total_buy_amount;
    stats
}
