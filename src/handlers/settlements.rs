use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::services::runner::{BatchReport, BatchRunner};
use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct RunResponse {
    pub success: bool,
    pub report: BatchReport,
}

/// Trigger endpoint for an external scheduler: runs one settlement batch at
/// the current time. Safe to invoke while another run is in flight.
#[utoipa::path(
    post,
    path = "/settlements/run",
    responses(
        (status = 200, description = "Batch completed", body = RunResponse),
        (status = 500, description = "Store unreachable, no partial state left behind")
    ),
    tag = "Settlements"
)]
pub async fn run_settlements(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let runner = BatchRunner::new(
        state.store.clone(),
        state.notifier.clone(),
        state.retry.clone(),
    );

    let report = runner.run(Utc::now()).await?;

    Ok(Json(RunResponse {
        success: true,
        report,
    }))
}
