use axum::extract::State;
use axum::routing::get;
use axum::Router;
use tracing::{info, warn};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health(State(state): State<AppState>) -> &'static str {
    info!("GET /health - Health check");
    if let Err(e) = sqlx::query("SELECT 1").execute(&state.pool).await {
        warn!("Health check database ping failed: {}", e);
        return "DEGRADED";
    }
    "OK"
}
