use std::sync::Arc;

use sqlx::PgPool;

use crate::db::{BalanceProvider, LedgerStore, UserDirectory};
use crate::external::MarketPriceProvider;
use crate::services::TransactionEngine;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: TransactionEngine,
    pub ledger: Arc<dyn LedgerStore>,
    pub balances: Arc<dyn BalanceProvider>,
    pub directory: Arc<dyn UserDirectory>,
    pub price_provider: Arc<dyn MarketPriceProvider>,
}
