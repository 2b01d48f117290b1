//! OHLCV bars and the per-instrument bar store.

use chrono::NaiveDateTime;

use super::error::TrendsimError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Checks the bar on its own: finite, strictly positive prices and a
    /// high that is not below the low.
    pub fn check_prices(&self) -> Result<(), String> {
        for (name, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be a positive finite price, got {value}"));
            }
        }
        if self.high < self.low {
            return Err(format!("high {} is below low {}", self.high, self.low));
        }
        Ok(())
    }
}

/// Checks bar `index` against its predecessor.
pub fn check_bar(index: usize, bar: &Bar, prev: Option<&Bar>) -> Result<(), TrendsimError> {
    let violation = |reason: String| TrendsimError::DataIntegrity {
        index,
        timestamp: bar.timestamp,
        reason,
    };

    bar.check_prices().map_err(violation)?;
    if let Some(prev) = prev {
        if bar.timestamp <= prev.timestamp {
            return Err(violation(format!(
                "timestamp not after previous bar ({})",
                prev.timestamp
            )));
        }
    }
    Ok(())
}

/// Ordered, append-only bar series for one instrument.
///
/// `new` stores provider output as given; the simulator re-checks every bar
/// as it walks the series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Full integrity pass, stopping at the first violation.
    pub fn validate(&self) -> Result<(), TrendsimError> {
        let mut prev = None;
        for (i, bar) in self.bars.iter().enumerate() {
            check_bar(i, bar, prev)?;
            prev = Some(bar);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_bar(day: u32) -> Bar {
        Bar {
            timestamp: ts(day),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000,
        }
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar(1);
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar(1);
        // |110-70| = 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar(1);
        // |90-130| = 40
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn check_bar_rejects_duplicate_timestamp() {
        let first = sample_bar(2);
        let err = check_bar(1, &sample_bar(2), Some(&first)).unwrap_err();
        assert!(matches!(err, TrendsimError::DataIntegrity { index: 1, .. }));
    }

    #[test]
    fn check_bar_rejects_non_positive_price() {
        let mut bar = sample_bar(1);
        bar.low = 0.0;
        let err = check_bar(0, &bar, None).unwrap_err();
        assert!(matches!(err, TrendsimError::DataIntegrity { index: 0, .. }));
    }

    #[test]
    fn validate_accepts_ordered_bars() {
        let series = BarSeries::new("SPY", vec![sample_bar(1), sample_bar(2), sample_bar(5)]);
        assert!(series.validate().is_ok());
        assert_eq!(series.symbol(), "SPY");
    }

    #[test]
    fn check_prices_rejects_nan_and_inverted_range() {
        let mut bar = sample_bar(1);
        bar.close = f64::NAN;
        assert!(bar.check_prices().is_err());

        let mut bar = sample_bar(1);
        bar.high = 80.0;
        assert!(bar.check_prices().is_err());
    }

    #[test]
    fn validate_reports_first_out_of_order_bar() {
        let series = BarSeries::new("SPY", vec![sample_bar(1), sample_bar(3), sample_bar(2)]);
        match series.validate() {
            Err(TrendsimError::DataIntegrity {
                index, timestamp, ..
            }) => {
                assert_eq!(index, 2);
                assert_eq!(timestamp, ts(2));
            }
            other => panic!("expected data integrity error, got {other:?}"),
        }
    }
}
