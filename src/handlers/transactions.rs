use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Direction, Transaction};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTransactionRequest {
    pub account_id: Uuid,
    #[schema(value_type = String, example = "50.00")]
    pub amount: BigDecimal,
    pub direction: Direction,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Ingest a pending transaction. Malformed records are rejected here, at
/// the boundary, before they can reach the settlement engine.
#[utoipa::path(
    post,
    path = "/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction accepted as pending", body = Transaction),
        (status = 400, description = "Invalid amount or direction"),
        (status = 404, description = "Referenced account does not exist")
    ),
    tag = "Transactions"
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.amount <= BigDecimal::from(0) {
        return Err(AppError::Validation(
            "amount must be strictly positive".to_string(),
        ));
    }

    if state.store.account(payload.account_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "account {} not found",
            payload.account_id
        )));
    }

    let tx = Transaction::new(
        payload.account_id,
        payload.amount,
        payload.direction,
        payload.scheduled_at,
    );

    let inserted = state.store.insert_transaction(&tx).await?;

    Ok((StatusCode::CREATED, Json(inserted)))
}

#[utoipa::path(
    get,
    path = "/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction found", body = Transaction),
        (status = 404, description = "Unknown transaction")
    ),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state
        .store
        .transaction(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("transaction {} not found", id)))?;

    Ok(Json(tx))
}

#[utoipa::path(
    get,
    path = "/transactions",
    responses((status = 200, description = "Most recent transactions", body = [Transaction])),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let limit = pagination.limit.unwrap_or(20);
    let offset = pagination.offset.unwrap_or(0);

    let transactions = state.store.list_transactions(limit, offset).await?;

    Ok(Json(transactions))
}
