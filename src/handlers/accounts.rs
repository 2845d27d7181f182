use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account found", body = crate::domain::Account),
        (status = 404, description = "Unknown account")
    ),
    tag = "Accounts"
)]
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let account = state
        .store
        .account(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {} not found", id)))?;

    Ok(Json(account))
}
