use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::BatchConfig;
use crate::models::Symbol;

use super::fetcher::{FetchOutcome, Fetcher, SymbolOutcome};

/// Outcomes of one orchestrated pass over the universe
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per input symbol, in no particular order
    pub outcomes: Vec<SymbolOutcome>,
    /// Batches actually fetched
    pub batch_count: usize,
    /// True if cancellation stopped the pass before every batch ran
    pub cancelled: bool,
}

/// Runs fetches in fixed-size batches with bounded concurrency
///
/// Every fetch in a batch resolves before the next batch starts. Batches are
/// separated by `inter_batch_delay` to stay under provider rate limits; that
/// pause is the first point at which cancellation takes effect.
pub struct BatchOrchestrator {
    fetcher: Arc<Fetcher>,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(fetcher: Arc<Fetcher>, config: BatchConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size.max(1)
    }

    /// Fetch every symbol, returning exactly one outcome per input symbol
    ///
    /// Symbols left unfetched because of cancellation come back as `Skipped`.
    pub async fn run(&self, symbols: Vec<Symbol>, cancel: &CancellationToken) -> BatchReport {
        let batch_size = self.batch_size();
        let concurrency = self.config.concurrency.max(1);
        let batches: Vec<Vec<Symbol>> = symbols.chunks(batch_size).map(|c| c.to_vec()).collect();
        let total_batches = batches.len();

        let mut report = BatchReport {
            outcomes: Vec::with_capacity(symbols.len()),
            ..BatchReport::default()
        };

        for (idx, batch) in batches.into_iter().enumerate() {
            if report.cancelled || cancel.is_cancelled() {
                report.cancelled = true;
                report.outcomes.extend(batch.into_iter().map(|symbol| SymbolOutcome {
                    symbol,
                    outcome: FetchOutcome::Skipped("run cancelled".to_string()),
                }));
                continue;
            }

            tracing::info!(
                "Processing batch {}/{} ({} symbols)",
                idx + 1,
                total_batches,
                batch.len()
            );

            let results: Vec<SymbolOutcome> = stream::iter(batch)
                .map(|symbol| async move {
                    let outcome = self.fetcher.fetch(&symbol).await;
                    SymbolOutcome { symbol, outcome }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

            report.outcomes.extend(results);
            report.batch_count += 1;

            if idx + 1 < total_batches {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Cancellation requested, stopping after batch {}", idx + 1);
                        report.cancelled = true;
                    }
                    _ = sleep(self.config.inter_batch_delay()) => {}
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferencePrice;
    use crate::sync::normalizer::SymbolNormalizer;
    use crate::test_support::{fast_retry, history, ScriptedQuoteProvider};
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    fn orchestrator(provider: Arc<ScriptedQuoteProvider>, batch_size: usize, concurrency: usize, delay_ms: u64) -> BatchOrchestrator {
        let fetcher = Arc::new(Fetcher::new(provider, fast_retry(2), ReferencePrice::PreviousClose));
        BatchOrchestrator::new(
            fetcher,
            BatchConfig {
                batch_size,
                concurrency,
                inter_batch_delay_ms: delay_ms,
            },
        )
    }

    fn provider_for(keys: &[&str]) -> ScriptedQuoteProvider {
        keys.iter().fold(ScriptedQuoteProvider::new(), |p, key| {
            p.with(&format!("{}.NS", key), history(100.0, 101.0))
        })
    }

    fn symbols(keys: &[&str]) -> Vec<Symbol> {
        SymbolNormalizer::default().normalize_all(keys)
    }

    #[tokio::test]
    async fn test_partitions_and_returns_one_outcome_per_symbol() {
        let keys = ["A", "B", "C", "D", "E"];
        let provider = Arc::new(provider_for(&keys));

        let report = orchestrator(provider, 2, 2, 1)
            .run(symbols(&keys), &CancellationToken::new())
            .await;

        assert_eq!(report.batch_count, 3);
        assert!(!report.cancelled);
        assert_eq!(report.outcomes.len(), 5);

        let returned: HashSet<_> = report.outcomes.iter().map(|o| o.symbol.storage_key.clone()).collect();
        assert_eq!(returned.len(), 5);
        assert!(report.outcomes.iter().all(|o| matches!(o.outcome, FetchOutcome::Quote(_))));
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let keys = ["A", "B", "C", "D", "E"];
        let provider = Arc::new(provider_for(&keys).always_failing("C.NS"));

        let report = orchestrator(provider.clone(), 5, 3, 1)
            .run(symbols(&keys), &CancellationToken::new())
            .await;

        let quotes = report
            .outcomes
            .iter()
            .filter(|o| matches!(o.outcome, FetchOutcome::Quote(_)))
            .count();
        let failed: Vec<_> = report
            .outcomes
            .iter()
            .filter(|o| matches!(o.outcome, FetchOutcome::Failed { .. }))
            .map(|o| o.symbol.storage_key.as_str())
            .collect();

        assert_eq!(quotes, 4);
        assert_eq!(failed, vec!["C"]);
        assert_eq!(provider.attempts("C.NS"), 2);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let keys = ["A", "B", "C", "D", "E", "F", "G", "H"];
        let provider = Arc::new(provider_for(&keys).with_latency(Duration::from_millis(20)));

        let report = orchestrator(provider.clone(), 8, 3, 1)
            .run(symbols(&keys), &CancellationToken::new())
            .await;

        assert_eq!(report.outcomes.len(), 8);
        assert!(provider.peak_in_flight() <= 3, "peak was {}", provider.peak_in_flight());
        assert!(provider.peak_in_flight() >= 2);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_inter_batch_delay() {
        let keys = ["A", "B", "C", "D"];
        let provider = Arc::new(provider_for(&keys));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let report = orchestrator(provider.clone(), 2, 2, 60_000)
            .run(symbols(&keys), &cancel)
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(report.cancelled);
        assert_eq!(report.batch_count, 1);
        assert_eq!(report.outcomes.len(), 4);

        let skipped = report
            .outcomes
            .iter()
            .filter(|o| matches!(o.outcome, FetchOutcome::Skipped(_)))
            .count();
        assert_eq!(skipped, 2);
        assert_eq!(provider.total_attempts(), 2);
    }

    #[tokio::test]
    async fn test_precancelled_run_fetches_nothing() {
        let keys = ["A", "B", "C"];
        let provider = Arc::new(provider_for(&keys));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = orchestrator(provider.clone(), 2, 2, 1).run(symbols(&keys), &cancel).await;

        assert!(report.cancelled);
        assert_eq!(report.batch_count, 0);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(provider.total_attempts(), 0);
    }
}
