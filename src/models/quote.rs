use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::sync::errors::FetchError;

/// Last-trade price snapshot for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    /// Storage key of the instrument (e.g., "RELIANCE")
    pub storage_key: String,

    /// Last traded price
    #[schema(example = 2600.0)]
    pub price: f64,

    /// Reference price the change is measured against
    #[schema(example = 2580.0)]
    pub prev_close: f64,

    /// Percent change from `prev_close`, rounded to 2 decimal places
    #[schema(example = 0.78)]
    pub change_pct: f64,

    /// When the quote was observed by this service
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    /// Build a quote from a price pair, computing `change_pct`
    ///
    /// Non-finite prices, a zero reference price and a change too large to
    /// represent are data quality failures.
    pub fn from_prices(
        storage_key: impl Into<String>,
        price: f64,
        prev_close: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, FetchError> {
        if !price.is_finite() {
            return Err(FetchError::DataQuality(format!("non-finite price: {}", price)));
        }
        if !prev_close.is_finite() {
            return Err(FetchError::DataQuality(format!(
                "non-finite previous close: {}",
                prev_close
            )));
        }

        if prev_close == 0.0 {
            return Err(FetchError::DataQuality("previous close is zero".to_string()));
        }

        let change_pct = change_percent(price, prev_close).ok_or_else(|| {
            FetchError::DataQuality(format!(
                "change percent out of range (price {}, previous close {})",
                price, prev_close
            ))
        })?;

        Ok(Self {
            storage_key: storage_key.into(),
            price,
            prev_close,
            change_pct,
            observed_at,
        })
    }
}

/// `(price - prev_close) / prev_close * 100`, rounded half away from zero to 2 dp
///
/// Returns `None` when `prev_close` is zero or the result is not representable.
pub fn change_percent(price: f64, prev_close: f64) -> Option<f64> {
    if prev_close == 0.0 {
        return None;
    }

    let raw = (price - prev_close) / prev_close * 100.0;
    Decimal::from_f64(raw)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_percent() {
        assert_eq!(change_percent(105.0, 100.0), Some(5.0));
        assert_eq!(change_percent(95.0, 100.0), Some(-5.0));
        assert_eq!(change_percent(3400.0, 3400.0), Some(0.0));
        assert_eq!(change_percent(2600.0, 2580.0), Some(0.78));
        assert_eq!(change_percent(19500.0, 19400.0), Some(0.52));
    }

    #[test]
    fn test_zero_prev_close_is_rejected() {
        assert_eq!(change_percent(10.0, 0.0), None);

        let err = Quote::from_prices("TCS", 10.0, 0.0, Utc::now()).unwrap_err();
        assert!(matches!(err, FetchError::DataQuality(_)));
        assert!(err.to_string().contains("previous close is zero"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unrepresentable_change_is_rejected() {
        assert_eq!(change_percent(1e30, 1e-10), None);

        let err = Quote::from_prices("TCS", 1e30, 1e-10, Utc::now()).unwrap_err();
        assert!(matches!(err, FetchError::DataQuality(_)));
        assert!(err.to_string().contains("out of range"));
        assert!(!err.to_string().contains("zero"));
    }

    #[test]
    fn test_non_finite_prices_are_rejected() {
        assert!(Quote::from_prices("TCS", f64::NAN, 100.0, Utc::now()).is_err());
        assert!(Quote::from_prices("TCS", 100.0, f64::INFINITY, Utc::now()).is_err());
    }
}
