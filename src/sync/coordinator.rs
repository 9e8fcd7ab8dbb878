use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::models::{AbortReason, FailureStage, SyncRun};
use crate::provider::QuoteProvider;

use super::change_detector::ChangeDetector;
use super::fetcher::{FetchOutcome, Fetcher, SymbolOutcome};
use super::gateway::{write_quotes, PersistenceGateway};
use super::normalizer::SymbolNormalizer;
use super::orchestrator::BatchOrchestrator;
use super::run_guard::{GuardDenied, RunGuard, RunGuardState};

/// Top-level synchronization workflow
///
/// Every trigger (the cron job and the HTTP endpoints) ends up in `synchronize`.
/// The coordinator owns the only cross-run mutable state: the run guard and
/// the summary of the last run that actually executed.
pub struct SyncCoordinator {
    gateway: Arc<dyn PersistenceGateway>,
    normalizer: SymbolNormalizer,
    orchestrator: BatchOrchestrator,
    detector: ChangeDetector,
    guard: RunGuard,
    shutdown: CancellationToken,
    last_run: RwLock<Option<SyncRun>>,
}

impl SyncCoordinator {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        provider: Arc<dyn QuoteProvider>,
        config: &SyncConfig,
        shutdown: CancellationToken,
    ) -> Self {
        tracing::info!(
            "Sync coordinator using provider {} (batch size {}, concurrency {}, min interval {}s)",
            provider.name(),
            config.batch.batch_size,
            config.batch.concurrency,
            config.min_interval_secs
        );

        let fetcher = Arc::new(Fetcher::new(provider, config.retry.clone(), config.reference_price));

        Self {
            gateway,
            normalizer: SymbolNormalizer::new(&config.normalizer),
            orchestrator: BatchOrchestrator::new(fetcher, config.batch.clone()),
            detector: ChangeDetector::new(config.always_write),
            guard: RunGuard::new(config.min_interval()),
            shutdown,
            last_run: RwLock::new(None),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    pub fn normalizer(&self) -> &SymbolNormalizer {
        &self.normalizer
    }

    pub fn guard_state(&self) -> RunGuardState {
        self.guard.state()
    }

    pub fn min_interval_secs(&self) -> u64 {
        self.guard.min_interval().as_secs()
    }

    /// Summary of the most recent run that got past the guard
    pub fn last_run(&self) -> Option<SyncRun> {
        self.last_run.read().clone()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run one synchronization pass and return its summary
    ///
    /// Never fails: guard denials, an unreadable universe and symbol-level
    /// errors are all reported in the returned `SyncRun`.
    pub async fn synchronize(&self) -> SyncRun {
        let run = SyncRun::start();

        let permit = match self.guard.try_acquire() {
            Ok(permit) => permit,
            Err(denied) => {
                tracing::info!(run_id = %run.run_id, "⏭️  Sync run skipped: {}", denied);
                let reason = match denied {
                    GuardDenied::AlreadyRunning => AbortReason::AlreadyRunning,
                    GuardDenied::TooSoon { .. } => AbortReason::TooSoon,
                };
                return run.abort(reason, denied.to_string());
            }
        };

        tracing::info!(run_id = %run.run_id, "🔄 Starting quote sync run");

        let run = self.execute(run).await;

        tracing::info!(
            run_id = %run.run_id,
            status = ?run.status,
            "✅ Sync run finished: {} total, {} updated, {} skipped, {} failed in {} batch(es)",
            run.symbols_total,
            run.symbols_updated,
            run.symbols_skipped,
            run.symbols_failed,
            run.batch_count
        );

        *self.last_run.write() = Some(run.clone());
        permit.release();

        run
    }

    /// Run `synchronize` on its own task and wait for the summary
    ///
    /// Dropping the returned future does not stop the run; only the shutdown
    /// token does. Triggers whose caller may go away (HTTP requests) use this.
    pub async fn synchronize_detached(self: &Arc<Self>) -> SyncRun {
        let coordinator = Arc::clone(self);

        match tokio::spawn(async move { coordinator.synchronize().await }).await {
            Ok(run) => run,
            Err(e) => {
                tracing::error!("❌ Sync task did not finish: {}", e);
                SyncRun::start().abort(AbortReason::Cancelled, format!("sync task did not finish: {}", e))
            }
        }
    }

    async fn execute(&self, mut run: SyncRun) -> SyncRun {
        let raw_symbols = match self.gateway.list_symbols().await {
            Ok(symbols) => symbols,
            Err(e) => {
                tracing::error!(run_id = %run.run_id, "Failed to read symbol universe: {}", e);
                return run.abort(
                    AbortReason::UniverseUnavailable,
                    format!("failed to read symbol universe: {}", e),
                );
            }
        };

        let symbols = self.normalizer.normalize_all(&raw_symbols);
        run.symbols_total = symbols.len();

        if symbols.is_empty() {
            tracing::info!(run_id = %run.run_id, "Symbol universe is empty, nothing to do");
            return run.complete();
        }

        let keys: Vec<String> = symbols.iter().map(|s| s.storage_key.clone()).collect();
        let previous = match self.gateway.get_last_quotes(&keys).await {
            Ok(previous) => previous,
            Err(e) => {
                // Upserts are idempotent, so writing every fetched quote is safe.
                tracing::warn!(
                    run_id = %run.run_id,
                    "Failed to load last quotes, treating all as new: {}",
                    e
                );
                HashMap::new()
            }
        };

        let report = self.orchestrator.run(symbols, &self.shutdown).await;
        run.batch_count = report.batch_count;

        let mut to_write = Vec::new();
        for SymbolOutcome { symbol, outcome } in report.outcomes {
            match outcome {
                FetchOutcome::Quote(quote) => {
                    if self.detector.should_persist(previous.get(&quote.storage_key), &quote) {
                        to_write.push(quote);
                    } else {
                        tracing::debug!("{} unchanged at {}, skipping", quote.storage_key, quote.price);
                        run.symbols_skipped += 1;
                    }
                }
                FetchOutcome::Skipped(reason) => {
                    tracing::debug!("{} skipped: {}", symbol.storage_key, reason);
                    run.symbols_skipped += 1;
                }
                FetchOutcome::Failed { error, attempts } => {
                    tracing::warn!(
                        "Failed to fetch {} ({}) after {} attempt(s): {}",
                        symbol.storage_key,
                        symbol.lookup_code,
                        attempts,
                        error
                    );
                    run.record_failure(symbol.storage_key, FailureStage::Fetch, error, attempts);
                }
            }
        }

        let written = write_quotes(self.gateway.as_ref(), to_write).await;
        for (storage_key, error) in written.failures {
            run.record_failure(storage_key, FailureStage::Persist, error, 0);
        }
        run.symbols_updated = written.written.len();
        run.updated = written.written;

        if report.cancelled {
            tracing::warn!(run_id = %run.run_id, "Sync run cancelled before all batches ran");
            return run.abort(AbortReason::Cancelled, "shutdown requested during run");
        }

        run.complete()
    }
}
