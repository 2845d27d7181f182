pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod ports;
pub mod services;
pub mod startup;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::ports::LedgerStore;
use crate::services::notifier::NotificationSink;
use crate::services::runner::RetryPolicy;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub notifier: Arc<dyn NotificationSink>,
    pub retry: RetryPolicy,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::settlements::run_settlements,
        handlers::transactions::create_transaction,
        handlers::transactions::get_transaction,
        handlers::transactions::list_transactions,
        handlers::accounts::get_account,
    ),
    components(schemas(
        domain::Account,
        domain::Transaction,
        domain::Direction,
        domain::TxStatus,
        handlers::HealthStatus,
        handlers::settlements::RunResponse,
        handlers::transactions::CreateTransactionRequest,
        services::runner::BatchReport,
    ))
)]
pub struct ApiDoc;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/settlements/run",
            post(handlers::settlements::run_settlements),
        )
        .route(
            "/transactions",
            post(handlers::transactions::create_transaction)
                .get(handlers::transactions::list_transactions),
        )
        .route("/transactions/:id", get(handlers::transactions::get_transaction))
        .route("/accounts/:id", get(handlers::accounts::get_account))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}
