use async_trait::async_trait;
use std::collections::HashSet;
use yahoo_finance_api as yahoo;

use super::{PriceBar, ProviderResponse, QuoteProvider};
use crate::config::{NormalizerConfig, ProviderConfig};
use crate::sync::errors::FetchError;

/// Yahoo Finance quote provider
///
/// Requests a short daily history per symbol; the last two bars carry both
/// the latest close and the prior session's close.
pub struct YahooQuoteProvider {
    connector: yahoo::YahooConnector,
    interval: String,
    range: String,
    index_symbols: HashSet<String>,
    index_marker: char,
}

impl YahooQuoteProvider {
    pub fn new(config: &ProviderConfig, symbols: &NormalizerConfig) -> Result<Self, FetchError> {
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| FetchError::Transport(format!("Failed to create Yahoo connector: {}", e)))?;

        Ok(Self {
            connector,
            interval: config.history_interval.clone(),
            range: config.history_range.clone(),
            index_symbols: symbols.index_symbols.iter().map(|s| s.trim().to_uppercase()).collect(),
            index_marker: symbols.index_marker,
        })
    }
}

/// Yahoo ticker for a lookup code; bare index codes get the index marker
fn yahoo_ticker(lookup_code: &str, index_symbols: &HashSet<String>, marker: char) -> String {
    if index_symbols.contains(lookup_code) {
        format!("{}{}", marker, lookup_code)
    } else {
        lookup_code.to_string()
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    fn name(&self) -> &'static str {
        "YAHOO"
    }

    async fn get_quote(&self, lookup_code: &str) -> Result<ProviderResponse, FetchError> {
        let ticker = yahoo_ticker(lookup_code, &self.index_symbols, self.index_marker);
        let response = self
            .connector
            .get_quote_range(&ticker, &self.interval, &self.range)
            .await
            .map_err(map_yahoo_error)?;

        let quotes = response.quotes().map_err(map_yahoo_error)?;

        tracing::debug!("Yahoo returned {} bar(s) for {}", quotes.len(), ticker);

        Ok(ProviderResponse::History(
            quotes
                .into_iter()
                .map(|q| PriceBar {
                    open: q.open,
                    close: q.close,
                })
                .collect(),
        ))
    }
}

fn map_yahoo_error(e: yahoo::YahooError) -> FetchError {
    match e {
        yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult => {
            FetchError::EmptyData { points: 0 }
        }
        other => FetchError::Transport(other.to_string()),
    }
}
