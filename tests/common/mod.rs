#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::collections::HashMap;
pub use trendsim::domain::bar::{Bar, BarSeries};
use trendsim::domain::config::EngineConfig;
use trendsim::domain::error::TrendsimError;
use trendsim::domain::metrics::Metrics;
use trendsim::domain::simulator::SimulationResult;
use trendsim::domain::sweep::SweepRun;
use trendsim::ports::data_port::DataPort;
use trendsim::ports::report_port::ReportPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        _timeframe: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<BarSeries, TrendsimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TrendsimError::Data {
                reason: reason.clone(),
            });
        }
        let bars: Vec<Bar> = self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| start.is_none_or(|s| b.timestamp >= s))
                    .filter(|b| end.is_none_or(|e| b.timestamp <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(TrendsimError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(BarSeries::new(symbol, bars))
    }
}

/// Records what it was asked to write.
#[derive(Default)]
pub struct RecordingReportPort {
    pub runs: RefCell<Vec<(usize, usize)>>,
    pub sweeps: RefCell<usize>,
}

impl ReportPort for RecordingReportPort {
    fn write(&self, result: &SimulationResult, metrics: &Metrics) -> Result<(), TrendsimError> {
        self.runs
            .borrow_mut()
            .push((result.equity_curve.len(), metrics.trade_count));
        Ok(())
    }

    fn write_sweep(&self, runs: &[SweepRun]) -> Result<(), TrendsimError> {
        *self.sweeps.borrow_mut() += runs.len();
        Ok(())
    }
}

pub fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::hours(i as i64)
}

pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: ts(i),
        open,
        high,
        low,
        close,
        volume: 1_000,
    }
}

/// Bars whose open, high and low all equal the close.
pub fn flat_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, c, c, c))
        .collect()
}

/// Bars with a fixed one-point range around each close.
pub fn ranged_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, c + 1.0, c - 1.0, c))
        .collect()
}

pub fn series(bars: Vec<Bar>) -> BarSeries {
    BarSeries::new("TEST", bars)
}

/// Small windows so scenarios stay a handful of bars long.
pub fn small_config(initial_cash: f64) -> EngineConfig {
    EngineConfig {
        fast_window: 2,
        slow_window: 4,
        atr_window: 2,
        ..EngineConfig::new(initial_cash)
    }
}

/// `n` bars at `low` followed by `n` bars at `high`.
pub fn step_closes(n: usize, low: f64, high: f64) -> Vec<f64> {
    let mut closes = vec![low; n];
    closes.extend(std::iter::repeat_n(high, n));
    closes
}
