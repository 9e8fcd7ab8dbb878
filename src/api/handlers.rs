use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::models::{Quote, SyncRun};
use crate::sync::{PersistenceError, SyncCoordinator};

use super::responses::*;

/// Shared application state
pub type AppState = Arc<SyncCoordinator>;

/// Convert PersistenceError to HTTP response
impl IntoResponse for PersistenceError {
    fn into_response(self) -> Response {
        let status = match &self {
            PersistenceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PersistenceError::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PersistenceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// Run a synchronization now
///
/// Guard denials and symbol failures are reported in the body; the status is
/// always 200. The run continues if the client disconnects.
#[utoipa::path(
    post,
    path = "/api/v1/sync",
    tag = "Sync",
    responses(
        (status = 200, description = "Run summary (may be aborted: already running, too soon)", body = SyncRun)
    )
)]
pub async fn trigger_sync(State(coordinator): State<AppState>) -> Json<SyncRun> {
    Json(coordinator.synchronize_detached().await)
}

/// Legacy trigger kept for existing cron callers
#[utoipa::path(
    get,
    path = "/update-prices",
    tag = "Sync",
    responses(
        (status = 200, description = "Run summary", body = SyncRun)
    )
)]
pub async fn update_prices(State(coordinator): State<AppState>) -> Json<SyncRun> {
    tracing::debug!("Sync triggered through legacy /update-prices");
    Json(coordinator.synchronize_detached().await)
}

/// Guard state and the last run summary
#[utoipa::path(
    get,
    path = "/api/v1/sync/status",
    tag = "Sync",
    responses(
        (status = 200, description = "Current sync status", body = SyncStatusResponse)
    )
)]
pub async fn get_sync_status(State(coordinator): State<AppState>) -> Json<SyncStatusResponse> {
    let state = coordinator.guard_state();

    Json(SyncStatusResponse {
        in_progress: state.in_progress,
        last_run_at: state.last_run_at,
        min_interval_secs: coordinator.min_interval_secs(),
        last_run: coordinator.last_run(),
    })
}

/// All persisted quotes
#[utoipa::path(
    get,
    path = "/api/v1/quotes",
    tag = "Quotes",
    responses(
        (status = 200, description = "Persisted quotes", body = QuoteListResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn get_quotes(
    State(coordinator): State<AppState>,
) -> Result<Json<QuoteListResponse>, PersistenceError> {
    let quotes = coordinator.gateway().list_quotes().await.map_err(|e| {
        tracing::error!("Failed to list quotes: {}", e);
        e
    })?;

    Ok(Json(QuoteListResponse {
        count: quotes.len(),
        quotes,
    }))
}

/// Persisted quote for one symbol
///
/// The path symbol is normalized first, so `tcs` and `TCS` are the same.
#[utoipa::path(
    get,
    path = "/api/v1/quotes/{symbol}",
    tag = "Quotes",
    params(
        ("symbol" = String, Path, description = "Symbol, e.g. RELIANCE or NSEI")
    ),
    responses(
        (status = 200, description = "Quote", body = Quote),
        (status = 404, description = "No quote for this symbol", body = ErrorResponse)
    )
)]
pub async fn get_quote(
    State(coordinator): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>, Response> {
    let storage_key = coordinator.normalizer().normalize(&symbol).storage_key;

    coordinator
        .gateway()
        .get_quote(&storage_key)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get quote {}: {}", storage_key, e);
            e.into_response()
        })?
        .map(Json)
        .ok_or_else(|| {
            let body = Json(ErrorResponse {
                error: StatusCode::NOT_FOUND.to_string(),
                message: format!("No quote for {}", storage_key),
            });
            (StatusCode::NOT_FOUND, body).into_response()
        })
}
