//! Shared test doubles

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::RetryPolicy;
use crate::database::repositories::{InMemoryQuoteRepository, QuoteRepository};
use crate::database::DatabaseError;
use crate::models::Quote;
use crate::provider::{PriceBar, ProviderResponse, QuoteProvider};
use crate::sync::errors::FetchError;

/// Two-bar daily history: prior close, then the latest close
pub fn history(prev_close: f64, price: f64) -> ProviderResponse {
    ProviderResponse::History(vec![
        PriceBar {
            open: prev_close,
            close: prev_close,
        },
        PriceBar {
            open: prev_close,
            close: price,
        },
    ])
}

/// Retry policy with millisecond delays for tests
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        retry_delay_ms: 1,
        request_timeout_ms: 1_000,
    }
}

/// Provider answering from a fixed script and counting attempts per lookup code
#[derive(Default)]
pub struct ScriptedQuoteProvider {
    responses: DashMap<String, ProviderResponse>,
    fail_first: DashMap<String, u32>,
    always_fail: HashSet<String>,
    attempts: DashMap<String, u32>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, lookup_code: &str, response: ProviderResponse) -> Self {
        self.responses.insert(lookup_code.to_string(), response);
        self
    }

    /// Fail the first `n` attempts for a lookup code with a transport error
    pub fn failing_first(self, lookup_code: &str, n: u32) -> Self {
        self.fail_first.insert(lookup_code.to_string(), n);
        self
    }

    pub fn always_failing(mut self, lookup_code: &str) -> Self {
        self.always_fail.insert(lookup_code.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn attempts(&self, lookup_code: &str) -> u32 {
        self.attempts.get(lookup_code).map(|v| *v).unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.iter().map(|e| *e.value()).sum()
    }

    /// Highest number of requests observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for ScriptedQuoteProvider {
    fn name(&self) -> &'static str {
        "SCRIPTED"
    }

    async fn get_quote(&self, lookup_code: &str) -> Result<ProviderResponse, FetchError> {
        *self.attempts.entry(lookup_code.to_string()).or_insert(0) += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.always_fail.contains(lookup_code) {
            return Err(FetchError::Transport("connection reset".to_string()));
        }

        if let Some(mut remaining) = self.fail_first.get_mut(lookup_code) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Transport("connection reset".to_string()));
            }
        }

        self.responses
            .get(lookup_code)
            .map(|r| r.clone())
            .ok_or_else(|| FetchError::Transport(format!("unknown lookup code {}", lookup_code)))
    }
}

/// Repository that fails on demand, delegating everything else to memory
#[derive(Default)]
pub struct FlakyRepository {
    inner: InMemoryQuoteRepository,
    rejected: HashSet<String>,
    fail_reads: bool,
    batch_calls: AtomicUsize,
}

impl FlakyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: InMemoryQuoteRepository::with_keys(keys),
            ..Self::default()
        }
    }

    /// Reject every write touching this key; a batch containing it fails whole
    pub fn rejecting(mut self, storage_key: &str) -> Self {
        self.rejected.insert(storage_key.to_string());
        self
    }

    /// Fail every read of the universe and of last quotes
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, storage_key: &str) -> Option<Quote> {
        self.inner.find_by_key(storage_key).ok().flatten()
    }

    fn check_reads(&self) -> Result<(), DatabaseError> {
        if self.fail_reads {
            return Err(DatabaseError::ConnectionFailed("connection refused".to_string()));
        }
        Ok(())
    }

    fn check_write(&self, quote: &Quote) -> Result<(), DatabaseError> {
        if self.rejected.contains(&quote.storage_key) {
            return Err(DatabaseError::ConnectionFailed(format!(
                "write rejected for {}",
                quote.storage_key
            )));
        }
        Ok(())
    }
}

impl QuoteRepository for FlakyRepository {
    fn list_keys(&self) -> Result<Vec<String>, DatabaseError> {
        self.check_reads()?;
        self.inner.list_keys()
    }

    fn find_latest(&self, keys: &[String]) -> Result<Vec<Quote>, DatabaseError> {
        self.check_reads()?;
        self.inner.find_latest(keys)
    }

    fn get_all(&self) -> Result<Vec<Quote>, DatabaseError> {
        self.inner.get_all()
    }

    fn find_by_key(&self, storage_key: &str) -> Result<Option<Quote>, DatabaseError> {
        self.inner.find_by_key(storage_key)
    }

    fn upsert_batch(&self, quotes: &[Quote]) -> Result<usize, DatabaseError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        for quote in quotes {
            self.check_write(quote)?;
        }
        self.inner.upsert_batch(quotes)
    }

    fn upsert_one(&self, quote: &Quote) -> Result<(), DatabaseError> {
        self.check_write(quote)?;
        self.inner.upsert_one(quote)
    }

    fn ensure_keys(&self, keys: &[String]) -> Result<usize, DatabaseError> {
        self.inner.ensure_keys(keys)
    }
}
