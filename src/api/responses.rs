use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Quote, SyncRun};

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Scheduler state plus the last executed run
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncStatusResponse {
    pub in_progress: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Minimum seconds between runs
    pub min_interval_secs: u64,
    /// Summary of the most recent run that was not denied by the guard
    pub last_run: Option<SyncRun>,
}

/// Persisted quotes
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuoteListResponse {
    pub quotes: Vec<Quote>,
    pub count: usize,
}
