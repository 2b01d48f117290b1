//! Technical indicator series.
//!
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorPoint`: one timestamped value, `None` during warm-up
//! - `IndicatorSeries`: a series aligned 1:1 with the bars it was computed from
//! - `IndicatorSet`: the read-only cache of every series a run needs

pub mod atr;
pub mod ema;

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

use super::bar::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Ema(usize),
    Atr(usize),
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at bar `index`; `None` before warm-up or past the end.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(|p| p.value)
    }
}

pub fn compute_indicator(bars: &[Bar], indicator_type: IndicatorType) -> IndicatorSeries {
    match indicator_type {
        IndicatorType::Ema(period) => ema::calculate_ema(bars, period),
        IndicatorType::Atr(period) => atr::calculate_atr(bars, period),
    }
}

/// Immutable cache of indicator series keyed by type.
///
/// Fully populated by `compute` before anything reads it, so one set can be
/// shared across threads by every run over the same bars.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    series: HashMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn compute(bars: &[Bar], types: &[IndicatorType]) -> Self {
        let mut series = HashMap::with_capacity(types.len());
        for &t in types {
            series
                .entry(t)
                .or_insert_with(|| compute_indicator(bars, t));
        }
        Self { series }
    }

    pub fn get(&self, indicator_type: IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(&indicator_type)
    }

    /// Value of `indicator_type` at bar `index`; `None` when the series is
    /// missing from the set or still warming up.
    pub fn value(&self, indicator_type: IndicatorType, index: usize) -> Option<f64> {
        self.get(indicator_type).and_then(|s| s.value_at(index))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
