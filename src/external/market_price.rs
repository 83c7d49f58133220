use async_trait::async_trait;
use bigdecimal::BigDecimal;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketPriceError {
    #[error("no quote for symbol {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Read-only quote source consumed by the holdings aggregator. The engine
/// never writes prices; where a quote comes from is a deployment choice.
#[async_trait]
pub trait MarketPriceProvider: Send + Sync {
    async fn get_price(&self, stock_code: &str) -> Result<BigDecimal, MarketPriceError>;
}

/// Static quote table. Used in tests and as a last-resort stub when no real
/// provider is configured.
#[derive(Default)]
pub struct FixedPriceProvider {
    prices: DashMap<String, BigDecimal>,
}

impl FixedPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, stock_code: &str, price: BigDecimal) {
        self.prices.insert(stock_code.to_uppercase(), price);
    }
}

#[async_trait]
impl MarketPriceProvider for FixedPriceProvider {
    async fn get_price(&self, stock_code: &str) -> Result<BigDecimal, MarketPriceError> {
        self.prices
            .get(&stock_code.to_uppercase())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| MarketPriceError::NotFound(stock_code.to_string()))
    }
}
