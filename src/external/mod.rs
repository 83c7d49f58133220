pub mod db_prices;
pub mod market_price;
pub mod quote_api;

pub use db_prices::DbPriceProvider;
pub use market_price::{FixedPriceProvider, MarketPriceError, MarketPriceProvider};
pub use quote_api::QuoteApiProvider;
