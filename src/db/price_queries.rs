use bigdecimal::BigDecimal;
use sqlx::PgPool;

/// Latest stored quote for a symbol, newest row wins.
pub async fn fetch_latest_price(
    pool: &PgPool,
    symbol: &str,
) -> Result<Option<BigDecimal>, sqlx::Error> {
    sqlx::query_scalar::<_, BigDecimal>(
        "SELECT price FROM stock_prices
         WHERE symbol = $1
         ORDER BY quoted_at DESC
         LIMIT 1",
    )
    .bind(symbol.to_uppercase())
    .fetch_optional(pool)
    .await
}
