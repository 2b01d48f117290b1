//! Historical data provider port trait.

use crate::domain::bar::BarSeries;
use crate::domain::error::TrendsimError;
use chrono::NaiveDateTime;

/// Returns ordered bars for one symbol and timeframe. Missing sessions are
/// simply absent, not errors. Bounds are inclusive; `None` is unbounded.
pub trait DataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<BarSeries, TrendsimError>;
}
