use crate::models::Quote;

/// Decides whether a freshly fetched quote is worth writing
///
/// This is the single place where "unchanged" is decided; the fetcher never
/// looks at persisted state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector {
    always_write: bool,
}

impl ChangeDetector {
    pub fn new(always_write: bool) -> Self {
        Self { always_write }
    }

    /// True when there is no prior quote, the price moved, or writes are forced
    pub fn should_persist(&self, previous: Option<&Quote>, candidate: &Quote) -> bool {
        match previous {
            _ if self.always_write => true,
            None => true,
            Some(previous) => previous.price != candidate.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(price: f64, prev_close: f64) -> Quote {
        Quote::from_prices("TCS", price, prev_close, Utc::now()).unwrap()
    }

    #[test]
    fn test_absent_previous_is_written() {
        assert!(ChangeDetector::default().should_persist(None, &quote(3400.0, 3400.0)));
    }

    #[test]
    fn test_unchanged_price_is_skipped() {
        let detector = ChangeDetector::default();
        let previous = quote(3400.0, 3390.0);

        assert!(!detector.should_persist(Some(&previous), &quote(3400.0, 3400.0)));
        assert!(detector.should_persist(Some(&previous), &quote(3401.5, 3400.0)));
    }

    #[test]
    fn test_always_write_policy() {
        let detector = ChangeDetector::new(true);
        let previous = quote(3400.0, 3400.0);

        assert!(detector.should_persist(Some(&previous), &quote(3400.0, 3400.0)));
    }
}
