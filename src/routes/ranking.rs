use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::errors::AppError;
use crate::models::{PageParams, RankingPage};
use crate::services::ranking_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_ranking))
}

/// Public leaderboard; not caller-scoped, so no principal required.
pub async fn get_ranking(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
) -> Result<Json<RankingPage>, AppError> {
    info!("GET /ranking - page {} limit {}", page.page, page.limit);
    let ranking = ranking_service::get_user_ranking(
        state.ledger.as_ref(),
        state.directory.as_ref(),
        &page,
    )
    .await?;
    Ok(Json(ranking))
}
