pub mod adapters;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod startup;
pub mod use_cases;
pub mod validation;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use crate::adapters::{
    PostgresAccountRepository, PostgresCategoryRepository, PostgresTransactionRepository,
};
use crate::middleware::request_logger_middleware;
use crate::ports::{AccountRepository, Cache, CategoryRepository, TransactionRepository};
use crate::services::{AccountLocks, AnalyticsService, TransactionService};
use crate::use_cases::ProcessTransaction;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub processor: Arc<ProcessTransaction>,
    pub transactions: Arc<TransactionService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppState {
    /// Wire the Postgres adapters and services onto a pool and a cache.
    pub fn new(db: sqlx::PgPool, cache: Arc<dyn Cache>) -> Self {
        let account_repository: Arc<dyn AccountRepository> =
            Arc::new(PostgresAccountRepository::new(db.clone()));
        let category_repository: Arc<dyn CategoryRepository> =
            Arc::new(PostgresCategoryRepository::new(db.clone()));
        let transaction_repository: Arc<dyn TransactionRepository> =
            Arc::new(PostgresTransactionRepository::new(db.clone()));
        let locks = Arc::new(AccountLocks::new());

        let processor = Arc::new(ProcessTransaction::new(
            transaction_repository.clone(),
            account_repository.clone(),
            category_repository.clone(),
            locks.clone(),
        ));

        let transactions = Arc::new(TransactionService::new(
            transaction_repository.clone(),
            account_repository,
            category_repository.clone(),
            cache.clone(),
            locks,
        ));

        let analytics = Arc::new(AnalyticsService::new(
            transaction_repository,
            category_repository,
            cache,
        ));

        Self {
            db,
            processor,
            transactions,
            analytics,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handlers::health),
    components(schemas(handlers::HealthStatus, handlers::DbPoolStats)),
    tags((name = "Health", description = "Service health probes"))
)]
struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route(
            "/transactions",
            post(handlers::transactions::process_transaction)
                .get(handlers::transactions::list_transactions),
        )
        .route(
            "/transactions/import",
            post(handlers::transactions::import_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::transactions::get_transaction)
                .patch(handlers::transactions::update_transaction)
                .delete(handlers::transactions::delete_transaction),
        )
        .route("/analytics/monthly", get(handlers::transactions::monthly_stats))
        .route(
            "/analytics/categories",
            get(handlers::transactions::category_analysis),
        )
        .route("/analytics/trends", get(handlers::transactions::trend_analysis))
        .route(
            "/analytics/comparison",
            get(handlers::transactions::comparison_analysis),
        )
        .route(
            "/analytics/insights",
            get(handlers::transactions::advanced_insights),
        )
        .layer(axum::middleware::from_fn(request_logger_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
