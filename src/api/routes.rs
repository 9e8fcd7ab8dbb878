use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::*;
use super::openapi::ApiDoc;

/// Create the API router with Swagger UI and per-request tracing
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check))
        // Sync triggers
        .route("/api/v1/sync", post(trigger_sync))
        .route("/update-prices", get(update_prices))
        .route("/api/v1/sync/status", get(get_sync_status))
        // Quote reads
        .route("/api/v1/quotes", get(get_quotes))
        .route("/api/v1/quotes/:symbol", get(get_quote))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
