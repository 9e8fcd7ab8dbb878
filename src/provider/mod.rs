//! Quote provider boundary
//!
//! Providers answer in one of two shapes (a snapshot of named fields or a
//! short price history). Both are reduced to a `PricePair` right here so the
//! engine never branches on provider-specific field presence.

pub mod yahoo;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ReferencePrice;
use crate::sync::errors::FetchError;

pub use yahoo::YahooQuoteProvider;

/// One bar of a provider price history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub open: f64,
    pub close: f64,
}

/// Raw provider answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProviderResponse {
    /// Named fields, any of which may be missing
    Snapshot {
        last_price: Option<f64>,
        previous_close: Option<f64>,
        open: Option<f64>,
    },
    /// Bars ordered oldest to newest
    History(Vec<PriceBar>),
}

/// Current price and the reference it is compared against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePair {
    pub price: f64,
    pub reference: f64,
}

impl ProviderResponse {
    /// Reduce the response to a price pair using the configured reference
    pub fn into_price_pair(self, reference: ReferencePrice) -> Result<PricePair, FetchError> {
        let pair = match self {
            ProviderResponse::Snapshot {
                last_price,
                previous_close,
                open,
            } => {
                let price = last_price.ok_or(FetchError::EmptyData { points: 0 })?;
                let (field, value) = match reference {
                    ReferencePrice::PreviousClose => ("previous_close", previous_close),
                    ReferencePrice::Open => ("open", open),
                };
                let reference = value.ok_or_else(|| {
                    FetchError::DataQuality(format!("missing field '{}'", field))
                })?;
                PricePair { price, reference }
            }
            ProviderResponse::History(bars) => match reference {
                ReferencePrice::PreviousClose => match bars.as_slice() {
                    [.., prior, last] => PricePair {
                        price: last.close,
                        reference: prior.close,
                    },
                    _ => return Err(FetchError::EmptyData { points: bars.len() }),
                },
                ReferencePrice::Open => match bars.last() {
                    Some(last) => PricePair {
                        price: last.close,
                        reference: last.open,
                    },
                    None => return Err(FetchError::EmptyData { points: 0 }),
                },
            },
        };

        if !pair.price.is_finite() || !pair.reference.is_finite() {
            return Err(FetchError::DataQuality(format!(
                "non-finite price pair ({}, {})",
                pair.price, pair.reference
            )));
        }

        Ok(pair)
    }
}

/// External source of last-trade prices
///
/// Implementations make a single request per call; retries and timeouts are
/// applied by the fetcher.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &'static str;

    /// Fetch the latest prices for a provider lookup code
    async fn get_quote(&self, lookup_code: &str) -> Result<ProviderResponse, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(closes: &[(f64, f64)]) -> ProviderResponse {
        ProviderResponse::History(
            closes
                .iter()
                .map(|&(open, close)| PriceBar { open, close })
                .collect(),
        )
    }

    #[test]
    fn test_history_previous_close() {
        let pair = bars(&[(2550.0, 2580.0), (2585.0, 2600.0)])
            .into_price_pair(ReferencePrice::PreviousClose)
            .unwrap();

        assert_eq!(pair, PricePair { price: 2600.0, reference: 2580.0 });
    }

    #[test]
    fn test_history_open_reference() {
        let pair = bars(&[(2585.0, 2600.0)])
            .into_price_pair(ReferencePrice::Open)
            .unwrap();

        assert_eq!(pair, PricePair { price: 2600.0, reference: 2585.0 });
    }

    #[test]
    fn test_short_history_is_empty_data() {
        let err = bars(&[(1.0, 2.0)])
            .into_price_pair(ReferencePrice::PreviousClose)
            .unwrap_err();
        assert_eq!(err, FetchError::EmptyData { points: 1 });

        let err = bars(&[]).into_price_pair(ReferencePrice::Open).unwrap_err();
        assert_eq!(err, FetchError::EmptyData { points: 0 });
    }

    #[test]
    fn test_snapshot_fields() {
        let snapshot = ProviderResponse::Snapshot {
            last_price: Some(19500.0),
            previous_close: Some(19400.0),
            open: None,
        };

        let pair = snapshot.clone().into_price_pair(ReferencePrice::PreviousClose).unwrap();
        assert_eq!(pair.reference, 19400.0);

        let err = snapshot.into_price_pair(ReferencePrice::Open).unwrap_err();
        assert!(matches!(err, FetchError::DataQuality(_)));
    }

    #[test]
    fn test_snapshot_without_price_is_retryable() {
        let err = ProviderResponse::Snapshot {
            last_price: None,
            previous_close: Some(1.0),
            open: Some(1.0),
        }
        .into_price_pair(ReferencePrice::PreviousClose)
        .unwrap_err();

        assert!(err.is_retryable());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let err = bars(&[(1.0, f64::NAN), (1.0, 2.0)])
            .into_price_pair(ReferencePrice::PreviousClose)
            .unwrap_err();

        assert!(matches!(err, FetchError::DataQuality(_)));
    }
}
