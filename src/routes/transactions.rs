use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthPrincipal;
use crate::errors::AppError;
use crate::models::{
    CreateTransaction, HistoryFilter, Holding, PageParams, TransactionPage, TransactionRecord,
    TransactionStats, TransactionStatus, TransactionType,
};
use crate::services::{holdings_service, stats_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transaction))
        .route("/user/:user_id", get(get_history))
        .route("/user/:user_id/stats", get(get_stats))
        .route("/user/:user_id/holdings", get(get_holdings))
        .route("/:transaction_id", get(get_transaction))
        .route("/:transaction_id/cancel", put(cancel_transaction))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    principal: AuthPrincipal,
    Json(input): Json<CreateTransaction>,
) -> Result<Json<TransactionRecord>, AppError> {
    info!(
        "POST /transactions - {:?} {} x{} for user {}",
        input.transaction_type, input.stock_code, input.quantity, input.user_id
    );
    principal.ensure_owns(input.user_id)?;

    let record = state.engine.create_transaction(input).await?;
    Ok(Json(record))
}

// serde_urlencoded cannot flatten nested structs, so the page params are
// inlined here and rebuilt below.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub transaction_type: Option<TransactionType>,
    pub stock_code: Option<String>,
    pub status: Option<TransactionStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn get_history(
    State(state): State<AppState>,
    principal: AuthPrincipal,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<TransactionPage>, AppError> {
    info!("GET /transactions/user/{} - history", user_id);
    principal.ensure_owns(user_id)?;

    let filter = HistoryFilter {
        transaction_type: query.transaction_type,
        stock_code: query.stock_code,
        status: query.status,
    };
    let defaults = PageParams::default();
    let params = PageParams {
        page: query.page.unwrap_or(defaults.page),
        limit: query.limit.unwrap_or(defaults.limit),
    };
    let page = state
        .engine
        .get_transaction_history(user_id, filter, params)
        .await?;
    Ok(Json(page))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    principal: AuthPrincipal,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionRecord>, AppError> {
    info!("GET /transactions/{}", transaction_id);
    let record = state
        .engine
        .get_transaction_by_id(transaction_id, principal.user_id)
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel_transaction(
    State(state): State<AppState>,
    principal: AuthPrincipal,
    Path(transaction_id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<TransactionRecord>, AppError> {
    info!("PUT /transactions/{}/cancel", transaction_id);
    let reason = body.and_then(|Json(b)| b.reason);
    let record = state
        .engine
        .cancel_transaction(transaction_id, principal.user_id, reason)
        .await?;
    Ok(Json(record))
}

pub async fn get_stats(
    State(state): State<AppState>,
    principal: AuthPrincipal,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TransactionStats>, AppError> {
    info!("GET /transactions/user/{}/stats", user_id);
    principal.ensure_owns(user_id)?;

    let stats = stats_service::get_user_transaction_stats(
        state.ledger.as_ref(),
        state.balances.as_ref(),
        user_id,
    )
    .await?;
    Ok(Json(stats))
}

pub async fn get_holdings(
    State(state): State<AppState>,
    principal: AuthPrincipal,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Holding>>, AppError> {
    info!("GET /transactions/user/{}/holdings", user_id);
    principal.ensure_owns(user_id)?;

    let holdings = holdings_service::get_all_user_holdings(
        state.ledger.as_ref(),
        state.price_provider.as_ref(),
        user_id,
    )
    .await?;
    Ok(Json(holdings))
}
