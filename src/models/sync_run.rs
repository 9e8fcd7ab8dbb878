use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::quote::Quote;

/// Lifecycle state of a synchronization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Completed,
    Aborted,
}

/// Why a run ended early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Another run holds the guard
    AlreadyRunning,
    /// The previous run finished less than the minimum interval ago
    TooSoon,
    /// The symbol universe could not be read from the store
    UniverseUnavailable,
    /// Shutdown was requested while the run was in progress
    Cancelled,
}

/// Pipeline stage at which a symbol failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Persist,
}

/// One symbol-level failure, kept in the run summary
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SymbolFailure {
    pub storage_key: String,
    pub stage: FailureStage,
    pub error: String,
    /// Provider attempts made (0 for persistence failures)
    pub attempts: u32,
}

/// Summary of one coordinator invocation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SyncRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<AbortReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub batch_count: usize,
    pub symbols_total: usize,
    pub symbols_updated: usize,
    pub symbols_skipped: usize,
    pub symbols_failed: usize,
    pub failures: Vec<SymbolFailure>,
    /// Quotes written during this run
    pub updated: Vec<Quote>,
}

impl SyncRun {
    /// Start a new run summary in the `Running` state
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            abort_reason: None,
            message: None,
            batch_count: 0,
            symbols_total: 0,
            symbols_updated: 0,
            symbols_skipped: 0,
            symbols_failed: 0,
            failures: Vec::new(),
            updated: Vec::new(),
        }
    }

    pub fn record_failure(
        &mut self,
        storage_key: impl Into<String>,
        stage: FailureStage,
        error: impl ToString,
        attempts: u32,
    ) {
        self.symbols_failed += 1;
        self.failures.push(SymbolFailure {
            storage_key: storage_key.into(),
            stage,
            error: error.to_string(),
            attempts,
        });
    }

    pub fn complete(mut self) -> Self {
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn abort(mut self, reason: AbortReason, message: impl Into<String>) -> Self {
        self.status = RunStatus::Aborted;
        self.abort_reason = Some(reason);
        self.message = Some(message.into());
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.status == RunStatus::Aborted
    }
}
