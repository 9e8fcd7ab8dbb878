use chrono::Utc;
use std::sync::Arc;
use tokio::time::{sleep, timeout};

use crate::config::{ReferencePrice, RetryPolicy};
use crate::models::{Quote, Symbol};
use crate::provider::QuoteProvider;

use super::errors::FetchError;

/// Result of fetching one symbol
///
/// Produced exactly once per symbol per run. Only `Quote` reaches the
/// change detector.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Quote(Quote),
    /// Not attempted (e.g., the run was cancelled first)
    Skipped(String),
    /// All attempts failed, or the data was unusable
    Failed { error: FetchError, attempts: u32 },
}

/// A fetch outcome paired with the symbol it belongs to
#[derive(Debug, Clone)]
pub struct SymbolOutcome {
    pub symbol: Symbol,
    pub outcome: FetchOutcome,
}

/// Wraps a quote provider with timeout and fixed-delay retry
///
/// Stateless with respect to persisted data: whether a quote is worth writing
/// is decided by `ChangeDetector` alone.
pub struct Fetcher {
    provider: Arc<dyn QuoteProvider>,
    policy: RetryPolicy,
    reference: ReferencePrice,
}

impl Fetcher {
    pub fn new(provider: Arc<dyn QuoteProvider>, policy: RetryPolicy, reference: ReferencePrice) -> Self {
        Self {
            provider,
            policy,
            reference,
        }
    }

    /// Fetch one symbol, never returning an error
    ///
    /// Transient failures are retried up to `max_retries` total attempts with a
    /// fixed delay; data quality failures end the fetch immediately.
    pub async fn fetch(&self, symbol: &Symbol) -> FetchOutcome {
        let max_attempts = self.policy.max_retries.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.attempt(symbol).await {
                Ok(quote) => {
                    tracing::debug!(
                        "{} ({}) = {} ({:+.2}%) after {} attempt(s)",
                        symbol.storage_key,
                        symbol.lookup_code,
                        quote.price,
                        quote.change_pct,
                        attempts
                    );
                    return FetchOutcome::Quote(quote);
                }
                Err(error) if !error.is_retryable() || attempts >= max_attempts => {
                    tracing::warn!(
                        "Fetch failed for {} after {} attempt(s): {}",
                        symbol.storage_key,
                        attempts,
                        error
                    );
                    return FetchOutcome::Failed { error, attempts };
                }
                Err(error) => {
                    tracing::debug!(
                        "Attempt {}/{} for {} failed: {}",
                        attempts,
                        max_attempts,
                        symbol.storage_key,
                        error
                    );
                    sleep(self.policy.retry_delay()).await;
                }
            }
        }
    }

    async fn attempt(&self, symbol: &Symbol) -> Result<Quote, FetchError> {
        let request_timeout = self.policy.request_timeout();

        let response = timeout(request_timeout, self.provider.get_quote(&symbol.lookup_code))
            .await
            .map_err(|_| FetchError::Timeout(request_timeout))??;

        let pair = response.into_price_pair(self.reference)?;
        Quote::from_prices(&symbol.storage_key, pair.price, pair.reference, Utc::now())
    }
}
