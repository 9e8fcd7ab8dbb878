use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::repositories::QuoteRepository;
use crate::database::DatabaseError;
use crate::models::Quote;

use super::errors::PersistenceError;

/// The engine's view of the shared quote store
///
/// Source of the symbol universe and the last-known quote per symbol, and the
/// sink for new quotes. Every write is an idempotent upsert by storage key.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Raw identifiers of every tracked symbol
    async fn list_symbols(&self) -> Result<Vec<String>, PersistenceError>;

    /// Last-known quotes keyed by storage key; unknown keys are absent
    async fn get_last_quotes(&self, keys: &[String]) -> Result<HashMap<String, Quote>, PersistenceError>;

    /// Whether `upsert_batch` is worth trying before per-record writes
    fn supports_batch(&self) -> bool {
        true
    }

    /// Write all quotes at once; fails as a whole
    async fn upsert_batch(&self, quotes: &[Quote]) -> Result<usize, PersistenceError>;

    /// Write one quote
    async fn upsert_one(&self, quote: &Quote) -> Result<(), PersistenceError>;

    /// Every persisted quote (read pass-through)
    async fn list_quotes(&self) -> Result<Vec<Quote>, PersistenceError>;

    async fn get_quote(&self, storage_key: &str) -> Result<Option<Quote>, PersistenceError>;

    /// Add symbols to the universe, leaving existing entries untouched
    async fn register_symbols(&self, keys: &[String]) -> Result<usize, PersistenceError>;
}

/// Outcome of writing a set of quotes
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<Quote>,
    pub failures: Vec<(String, PersistenceError)>,
}

/// Write quotes as one batch when possible, else record by record
///
/// A failed batch falls back to per-record writes so one bad record cannot
/// block the rest.
pub async fn write_quotes(gateway: &dyn PersistenceGateway, quotes: Vec<Quote>) -> WriteReport {
    let mut report = WriteReport::default();
    if quotes.is_empty() {
        return report;
    }

    if gateway.supports_batch() {
        match gateway.upsert_batch(&quotes).await {
            Ok(count) => {
                tracing::debug!("Batch upsert wrote {} quote(s)", count);
                report.written = quotes;
                return report;
            }
            Err(e) => {
                tracing::warn!(
                    "Batch upsert of {} quote(s) failed, retrying per record: {}",
                    quotes.len(),
                    e
                );
            }
        }
    }

    for quote in quotes {
        match gateway.upsert_one(&quote).await {
            Ok(()) => report.written.push(quote),
            Err(e) => {
                tracing::warn!("Failed to persist {}: {}", quote.storage_key, e);
                report.failures.push((quote.storage_key, e));
            }
        }
    }

    report
}

/// Adapts a blocking `QuoteRepository` to the async gateway
///
/// Each call runs on tokio's blocking pool.
#[derive(Clone)]
pub struct RepositoryGateway {
    repository: Arc<dyn QuoteRepository>,
}

impl RepositoryGateway {
    pub fn new(repository: Arc<dyn QuoteRepository>) -> Self {
        Self { repository }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, PersistenceError>
    where
        F: FnOnce(&dyn QuoteRepository) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let repository = Arc::clone(&self.repository);

        tokio::task::spawn_blocking(move || f(repository.as_ref()))
            .await
            .map_err(|e| PersistenceError::Unavailable(format!("blocking task failed: {}", e)))?
            .map_err(PersistenceError::from)
    }
}

#[async_trait]
impl PersistenceGateway for RepositoryGateway {
    async fn list_symbols(&self) -> Result<Vec<String>, PersistenceError> {
        self.blocking(|repo| repo.list_keys()).await
    }

    async fn get_last_quotes(&self, keys: &[String]) -> Result<HashMap<String, Quote>, PersistenceError> {
        let keys = keys.to_vec();
        let quotes = self.blocking(move |repo| repo.find_latest(&keys)).await?;

        Ok(quotes
            .into_iter()
            .map(|q| (q.storage_key.clone(), q))
            .collect())
    }

    async fn upsert_batch(&self, quotes: &[Quote]) -> Result<usize, PersistenceError> {
        let quotes = quotes.to_vec();
        self.blocking(move |repo| repo.upsert_batch(&quotes)).await
    }

    async fn upsert_one(&self, quote: &Quote) -> Result<(), PersistenceError> {
        let quote = quote.clone();
        self.blocking(move |repo| repo.upsert_one(&quote)).await
    }

    async fn list_quotes(&self) -> Result<Vec<Quote>, PersistenceError> {
        self.blocking(|repo| repo.get_all()).await
    }

    async fn get_quote(&self, storage_key: &str) -> Result<Option<Quote>, PersistenceError> {
        let storage_key = storage_key.to_string();
        self.blocking(move |repo| repo.find_by_key(&storage_key)).await
    }

    async fn register_symbols(&self, keys: &[String]) -> Result<usize, PersistenceError> {
        let keys = keys.to_vec();
        self.blocking(move |repo| repo.ensure_keys(&keys)).await
    }
}
