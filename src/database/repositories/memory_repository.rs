use dashmap::DashMap;

use crate::database::connection::DatabaseError;
use crate::models::Quote;

use super::quote_repository::QuoteRepository;

/// In-process quote store used when no database is configured
///
/// A key mapped to `None` is a universe member without a price yet.
#[derive(Default)]
pub struct InMemoryQuoteRepository {
    rows: DashMap<String, Option<Quote>>,
}

impl InMemoryQuoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose universe holds the given keys
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repo = Self::new();
        for key in keys {
            repo.rows.insert(key.into(), None);
        }
        repo
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl QuoteRepository for InMemoryQuoteRepository {
    fn list_keys(&self) -> Result<Vec<String>, DatabaseError> {
        let mut keys: Vec<String> = self.rows.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }

    fn find_latest(&self, keys: &[String]) -> Result<Vec<Quote>, DatabaseError> {
        Ok(keys
            .iter()
            .filter_map(|key| self.rows.get(key).and_then(|row| row.value().clone()))
            .collect())
    }

    fn get_all(&self) -> Result<Vec<Quote>, DatabaseError> {
        let mut quotes: Vec<Quote> = self.rows.iter().filter_map(|e| e.value().clone()).collect();
        quotes.sort_by(|a, b| a.storage_key.cmp(&b.storage_key));
        Ok(quotes)
    }

    fn find_by_key(&self, storage_key: &str) -> Result<Option<Quote>, DatabaseError> {
        Ok(self.rows.get(storage_key).and_then(|row| row.value().clone()))
    }

    fn upsert_batch(&self, quotes: &[Quote]) -> Result<usize, DatabaseError> {
        for quote in quotes {
            self.rows.insert(quote.storage_key.clone(), Some(quote.clone()));
        }
        Ok(quotes.len())
    }

    fn upsert_one(&self, quote: &Quote) -> Result<(), DatabaseError> {
        self.rows.insert(quote.storage_key.clone(), Some(quote.clone()));
        Ok(())
    }

    fn ensure_keys(&self, keys: &[String]) -> Result<usize, DatabaseError> {
        let mut inserted = 0;
        for key in keys {
            self.rows.entry(key.clone()).or_insert_with(|| {
                inserted += 1;
                None
            });
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(key: &str, price: f64) -> Quote {
        Quote::from_prices(key, price, 100.0, Utc::now()).unwrap()
    }

    #[test]
    fn test_universe_and_unpriced_members() {
        let repo = InMemoryQuoteRepository::with_keys(["TCS", "NSEI"]);

        assert_eq!(repo.list_keys().unwrap(), vec!["NSEI", "TCS"]);
        assert!(repo.get_all().unwrap().is_empty());
        assert!(repo.find_by_key("TCS").unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let repo = InMemoryQuoteRepository::new();
        let q = quote("TCS", 105.0);

        repo.upsert_batch(&[q.clone()]).unwrap();
        repo.upsert_batch(&[q.clone()]).unwrap();
        repo.upsert_one(&q).unwrap();

        assert_eq!(repo.len(), 1);
        assert_eq!(repo.find_by_key("TCS").unwrap(), Some(q));
    }

    #[test]
    fn test_ensure_keys_keeps_prices() {
        let repo = InMemoryQuoteRepository::new();
        repo.upsert_one(&quote("TCS", 105.0)).unwrap();

        let inserted = repo
            .ensure_keys(&["TCS".to_string(), "INFY".to_string()])
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(repo.find_by_key("TCS").unwrap().map(|q| q.price), Some(105.0));
        assert_eq!(repo.list_keys().unwrap(), vec!["INFY", "TCS"]);
    }

    #[test]
    fn test_find_latest_omits_unpriced() {
        let repo = InMemoryQuoteRepository::with_keys(["INFY"]);
        repo.upsert_one(&quote("TCS", 105.0)).unwrap();

        let latest = repo
            .find_latest(&["TCS".to_string(), "INFY".to_string(), "WIPRO".to_string()])
            .unwrap();

        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].storage_key, "TCS");
    }
}
