use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use tracing::warn;
use uuid::Uuid;

use crate::db::LedgerStore;
use crate::errors::AppError;
use crate::external::MarketPriceProvider;
use crate::models::{Holding, TransactionRecord, TransactionStatus, TransactionType};

/// Running position for one symbol during ledger replay.
#[derive(Debug, Clone)]
pub struct PositionLot {
    pub stock_name: String,
    pub quantity: i64,
    /// Remaining weighted-average cost basis. Buys add quantity * price;
    /// sells remove a proportional share, leaving the average unchanged.
    pub cost_basis: BigDecimal,
}

/// Replays COMPLETED records (executed_at ascending) into net positions.
/// Symbols that net out to zero are dropped.
pub fn replay_positions(records: &[TransactionRecord]) -> BTreeMap<String, PositionLot> {
    let mut positions: BTreeMap<String, PositionLot> = BTreeMap::new();

    for record in records {
        if record.status != TransactionStatus::Completed {
            continue;
        }
        let lot = positions
            .entry(record.stock_code.clone())
            .or_insert_with(|| PositionLot {
                stock_name: record.stock_name.clone(),
                quantity: 0,
                cost_basis: BigDecimal::from(0),
            });
        lot.stock_name = record.stock_name.clone();

        match record.transaction_type {
            TransactionType::Buy => {
                lot.cost_basis = &lot.cost_basis + &record.total_amount;
                lot.quantity += record.quantity;
            }
            TransactionType::Sell => {
                let before = lot.quantity;
                if before > 0 {
                    let sold = record.quantity.min(before);
                    let reduction =
                        (&lot.cost_basis * BigDecimal::from(sold)) / BigDecimal::from(before);
                    lot.cost_basis = &lot.cost_basis - &reduction;
                }
                lot.quantity -= record.quantity;
            }
        }
    }

    positions.retain(|_, lot| lot.quantity > 0);
    positions
}

/// Net COMPLETED quantity held in one symbol; the sell-side funds check.
pub fn net_quantity(records: &[TransactionRecord], stock_code: &str) -> i64 {
    replay_positions(records)
        .get(&stock_code.to_uppercase())
        .map(|lot| lot.quantity)
        .unwrap_or(0)
}

/// Current positions with cost basis and unrealized P&L. Derived on every
/// read from the COMPLETED subset of the ledger; nothing here is persisted.
pub async fn get_all_user_holdings(
    ledger: &dyn LedgerStore,
    prices: &dyn MarketPriceProvider,
    user_id: Uuid,
) -> Result<Vec<Holding>, AppError> {
    let records = ledger.fetch_completed_for_user(user_id).await?;
    let positions = replay_positions(&records);

    let mut holdings = Vec::with_capacity(positions.len());
    for (stock_code, lot) in positions {
        let current_price = match prices.get_price(&stock_code).await {
            Ok(price) => price,
            Err(e) => {
                // A missing quote degrades this one symbol, not the whole view
                warn!("No current price for {}: {}", stock_code, e);
                BigDecimal::from(0)
            }
        };

        let total_invested = lot.cost_basis.clone();
        let average_buy_price = &total_invested / BigDecimal::from(lot.quantity);
        let current_value = &current_price * BigDecimal::from(lot.quantity);
        let profit_loss = &current_value - &total_invested;
        let profit_loss_percent = if total_invested > BigDecimal::from(0) {
            (&profit_loss / &total_invested) * BigDecimal::from(100)
        } else {
            BigDecimal::from(0)
        };

        holdings.push(Holding {
            stock_code,
            stock_name: lot.stock_name,
            quantity: lot.quantity,
            average_buy_price,
            current_price,
            total_invested,
            current_value,
            profit_loss,
            profit_loss_percent,
        });
    }

    Ok(holdings)
}
