use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::models::Quote;

/// Row of the `live_prices` table
///
/// A row with no price is a universe member that has not been priced yet.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::database::schema::live_prices)]
#[diesel(primary_key(storage_key))]
pub struct LivePrice {
    pub storage_key: String,
    pub price: Option<f64>,
    pub prev_close: Option<f64>,
    pub change_pct: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LivePrice {
    /// Convert to a quote, or `None` for unpriced rows
    pub fn into_quote(self) -> Option<Quote> {
        Some(Quote {
            storage_key: self.storage_key,
            price: self.price?,
            prev_close: self.prev_close?,
            change_pct: self.change_pct?,
            observed_at: self.observed_at?,
        })
    }
}

/// Insertable row; `None` fields insert NULL
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::database::schema::live_prices)]
pub struct NewLivePrice {
    pub storage_key: String,
    pub price: Option<f64>,
    pub prev_close: Option<f64>,
    pub change_pct: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl NewLivePrice {
    /// Placeholder row registering a symbol in the universe
    pub fn unpriced(storage_key: String) -> Self {
        Self {
            storage_key,
            price: None,
            prev_close: None,
            change_pct: None,
            observed_at: None,
            updated_at: Utc::now(),
        }
    }
}

impl From<&Quote> for NewLivePrice {
    fn from(quote: &Quote) -> Self {
        Self {
            storage_key: quote.storage_key.clone(),
            price: Some(quote.price),
            prev_close: Some(quote.prev_close),
            change_pct: Some(quote.change_pct),
            observed_at: Some(quote.observed_at),
            updated_at: Utc::now(),
        }
    }
}
