use std::str::FromStr;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::external::market_price::{MarketPriceError, MarketPriceProvider};

/// Fetches quotes from an HTTP quote service exposing
/// `GET {base_url}/quote?symbol=XYZ` -> `{"symbol": "XYZ", "price": "12.34"}`.
pub struct QuoteApiProvider {
    client: reqwest::Client,
    base_url: String,
}

impl QuoteApiProvider {
    pub fn from_env() -> Result<Self, MarketPriceError> {
        let base_url = std::env::var("QUOTE_API_URL")
            .map_err(|_| MarketPriceError::BadResponse("QUOTE_API_URL not set".into()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[allow(dead_code)]
    symbol: String,
    price: Option<String>,
}

#[async_trait]
impl MarketPriceProvider for QuoteApiProvider {
    async fn get_price(&self, stock_code: &str) -> Result<BigDecimal, MarketPriceError> {
        let url = format!("{}/quote", self.base_url.trim_end_matches('/'));

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", stock_code)])
            .send()
            .await
            .map_err(|e| MarketPriceError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MarketPriceError::BadResponse(format!(
                "quote API returned {}",
                resp.status()
            )));
        }

        let body: QuoteResponse = resp
            .json()
            .await
            .map_err(|e| MarketPriceError::BadResponse(e.to_string()))?;

        let raw = body
            .price
            .ok_or_else(|| MarketPriceError::NotFound(stock_code.to_string()))?;

        BigDecimal::from_str(&raw)
            .map_err(|e| MarketPriceError::BadResponse(format!("unparseable price {raw}: {e}")))
    }
}
