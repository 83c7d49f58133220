use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use papertrade_backend::app;
use papertrade_backend::config::EngineConfig;
use papertrade_backend::db::{PgLedgerStore, PgUserStore};
use papertrade_backend::external::{DbPriceProvider, MarketPriceProvider, QuoteApiProvider};
use papertrade_backend::logging::{init_logging, LoggingConfig};
use papertrade_backend::services::{InMemoryLockProvider, TransactionEngine, UserLockService};
use papertrade_backend::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env())?;

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    let ledger = Arc::new(PgLedgerStore::new(pool.clone()));
    let users = Arc::new(PgUserStore::new(pool.clone()));

    // Single-node deployment: process-local locks. A distributed backend can
    // be swapped in behind the same LockProvider interface.
    let locks = UserLockService::new(
        Arc::new(InMemoryLockProvider::new()),
        EngineConfig::from_env(),
    );
    let engine = TransactionEngine::new(ledger.clone(), users.clone(), locks);

    let provider_name =
        std::env::var("PRICE_PROVIDER").unwrap_or_else(|_| "db".to_string());
    let price_provider: Arc<dyn MarketPriceProvider> = match provider_name.to_lowercase().as_str() {
        "db" => {
            tracing::info!("Using price provider: stock_prices table");
            Arc::new(DbPriceProvider::new(pool.clone()))
        }
        "quote-api" => {
            tracing::info!("Using price provider: HTTP quote API");
            Arc::new(QuoteApiProvider::from_env()?)
        }
        _ => {
            return Err(format!(
                "Invalid PRICE_PROVIDER: {}. Must be 'db' or 'quote-api'",
                provider_name
            )
            .into());
        }
    };

    let state = AppState {
        pool,
        engine,
        ledger,
        balances: users.clone(),
        directory: users,
        price_provider,
    };
    let app = app::create_app(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Papertrade backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
