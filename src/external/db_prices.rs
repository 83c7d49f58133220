use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;

use crate::db::price_queries;
use crate::external::market_price::{MarketPriceError, MarketPriceProvider};

/// Serves quotes from the stock_prices table, which a separate ingestion
/// job keeps fresh. This is the default provider for deployments that
/// already mirror market data locally.
pub struct DbPriceProvider {
    pool: PgPool,
}

impl DbPriceProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketPriceProvider for DbPriceProvider {
    async fn get_price(&self, stock_code: &str) -> Result<BigDecimal, MarketPriceError> {
        price_queries::fetch_latest_price(&self.pool, stock_code)
            .await
            .map_err(|e| MarketPriceError::Storage(e.to_string()))?
            .ok_or_else(|| MarketPriceError::NotFound(stock_code.to_string()))
    }
}
