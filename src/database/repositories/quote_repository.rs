use crate::database::connection::{DatabaseError, PgPooledConnection};
use crate::database::models::{LivePrice, NewLivePrice};
use crate::database::schema::live_prices;
use crate::models::Quote;
use diesel::prelude::*;
use diesel::upsert::excluded;
use std::sync::Arc;

/// Quote repository trait - storage for the symbol universe and last-known quotes
///
/// Every write is keyed by `storage_key` and safe to repeat with the same input.
pub trait QuoteRepository: Send + Sync {
    /// All storage keys in the universe, priced or not
    fn list_keys(&self) -> Result<Vec<String>, DatabaseError>;

    /// Last-known quotes for the given keys (unpriced keys are omitted)
    fn find_latest(&self, keys: &[String]) -> Result<Vec<Quote>, DatabaseError>;

    /// Every priced quote, ordered by key
    fn get_all(&self) -> Result<Vec<Quote>, DatabaseError>;

    /// Last-known quote for one key
    fn find_by_key(&self, storage_key: &str) -> Result<Option<Quote>, DatabaseError>;

    /// Upsert all quotes in one statement; all or nothing
    fn upsert_batch(&self, quotes: &[Quote]) -> Result<usize, DatabaseError>;

    /// Upsert a single quote
    fn upsert_one(&self, quote: &Quote) -> Result<(), DatabaseError>;

    /// Register keys in the universe without touching existing rows
    fn ensure_keys(&self, keys: &[String]) -> Result<usize, DatabaseError>;
}

/// Diesel implementation backed by the `live_prices` table
pub struct QuoteRepositoryImpl {
    get_conn: Arc<dyn Fn() -> Result<PgPooledConnection, DatabaseError> + Send + Sync>,
}

impl QuoteRepositoryImpl {
    /// Create new quote repository with connection provider
    pub fn new<F>(get_conn: F) -> Self
    where
        F: Fn() -> Result<PgPooledConnection, DatabaseError> + Send + Sync + 'static,
    {
        Self {
            get_conn: Arc::new(get_conn),
        }
    }

    fn upsert_rows(conn: &mut PgConnection, rows: &[NewLivePrice]) -> Result<usize, DatabaseError> {
        diesel::insert_into(live_prices::table)
            .values(rows)
            .on_conflict(live_prices::storage_key)
            .do_update()
            .set((
                live_prices::price.eq(excluded(live_prices::price)),
                live_prices::prev_close.eq(excluded(live_prices::prev_close)),
                live_prices::change_pct.eq(excluded(live_prices::change_pct)),
                live_prices::observed_at.eq(excluded(live_prices::observed_at)),
                live_prices::updated_at.eq(excluded(live_prices::updated_at)),
            ))
            .execute(conn)
            .map_err(DatabaseError::from)
    }
}

impl QuoteRepository for QuoteRepositoryImpl {
    fn list_keys(&self) -> Result<Vec<String>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        live_prices::table
            .select(live_prices::storage_key)
            .order(live_prices::storage_key.asc())
            .load::<String>(&mut conn)
            .map_err(DatabaseError::from)
    }

    fn find_latest(&self, keys: &[String]) -> Result<Vec<Quote>, DatabaseError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = (self.get_conn)()?;

        let rows = live_prices::table
            .filter(live_prices::storage_key.eq_any(keys))
            .filter(live_prices::price.is_not_null())
            .select(LivePrice::as_select())
            .load::<LivePrice>(&mut conn)?;

        Ok(rows.into_iter().filter_map(LivePrice::into_quote).collect())
    }

    fn get_all(&self) -> Result<Vec<Quote>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        let rows = live_prices::table
            .filter(live_prices::price.is_not_null())
            .order(live_prices::storage_key.asc())
            .select(LivePrice::as_select())
            .load::<LivePrice>(&mut conn)?;

        Ok(rows.into_iter().filter_map(LivePrice::into_quote).collect())
    }

    fn find_by_key(&self, storage_key: &str) -> Result<Option<Quote>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        let row = live_prices::table
            .filter(live_prices::storage_key.eq(storage_key))
            .select(LivePrice::as_select())
            .first::<LivePrice>(&mut conn)
            .optional()?;

        Ok(row.and_then(LivePrice::into_quote))
    }

    fn upsert_batch(&self, quotes: &[Quote]) -> Result<usize, DatabaseError> {
        if quotes.is_empty() {
            return Ok(0);
        }

        let mut conn = (self.get_conn)()?;
        let rows: Vec<NewLivePrice> = quotes.iter().map(NewLivePrice::from).collect();

        conn.transaction::<_, DatabaseError, _>(|conn| Self::upsert_rows(conn, &rows))
    }

    fn upsert_one(&self, quote: &Quote) -> Result<(), DatabaseError> {
        let mut conn = (self.get_conn)()?;

        Self::upsert_rows(&mut conn, &[NewLivePrice::from(quote)])?;
        Ok(())
    }

    fn ensure_keys(&self, keys: &[String]) -> Result<usize, DatabaseError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = (self.get_conn)()?;
        let rows: Vec<NewLivePrice> = keys.iter().cloned().map(NewLivePrice::unpriced).collect();

        diesel::insert_into(live_prices::table)
            .values(&rows)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .map_err(DatabaseError::from)
    }
}
