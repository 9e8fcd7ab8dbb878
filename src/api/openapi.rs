use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::responses::*;
use crate::models::{AbortReason, FailureStage, Quote, RunStatus, SymbolFailure, SyncRun};

/// OpenAPI specification
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quote Sync API",
        version = "1.0.0",
        description = "Keeps a store of last-known instrument prices in sync with a market data provider"
    ),
    paths(
        handlers::health_check,
        handlers::trigger_sync,
        handlers::update_prices,
        handlers::get_sync_status,
        handlers::get_quotes,
        handlers::get_quote,
    ),
    components(
        schemas(
            Quote,
            SyncRun,
            RunStatus,
            AbortReason,
            FailureStage,
            SymbolFailure,
            SyncStatusResponse,
            QuoteListResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Sync", description = "Synchronization triggers and status"),
        (name = "Quotes", description = "Persisted quote reads"),
    )
)]
pub struct ApiDoc;
