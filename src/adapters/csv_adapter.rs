//! CSV file data adapter.
//!
//! One file per symbol and timeframe, `<SYMBOL>_<TIMEFRAME>.csv`, with a
//! header row and columns `timestamp,open,high,low,close,volume`. Rows are
//! returned in file order; ordering is checked by the simulator.

use crate::domain::bar::{Bar, BarSeries};
use crate::domain::error::TrendsimError;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, timeframe))
    }
}

/// Accepts date-times with or without seconds, or a bare date (midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<T, TrendsimError>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(index).ok_or_else(|| TrendsimError::Data {
        reason: format!("line {line}: missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| TrendsimError::Data {
        reason: format!("line {line}: invalid {name} value '{raw}': {e}"),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<BarSeries, TrendsimError> {
        let path = self.csv_path(symbol, timeframe);
        let content = fs::read_to_string(&path).map_err(|e| TrendsimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TrendsimError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let raw_ts = record.get(0).ok_or_else(|| TrendsimError::Data {
                reason: format!("line {line}: missing timestamp column"),
            })?;
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| TrendsimError::Data {
                reason: format!("line {line}: invalid timestamp '{raw_ts}'"),
            })?;

            if start.is_some_and(|s| timestamp < s) || end.is_some_and(|e| timestamp > e) {
                continue;
            }

            bars.push(Bar {
                timestamp,
                open: field(&record, 1, "open", line)?,
                high: field(&record, 2, "high", line)?,
                low: field(&record, 3, "low", line)?,
                close: field(&record, 4, "close", line)?,
                volume: field(&record, 5, "volume", line)?,
            });
        }

        if bars.is_empty() {
            return Err(TrendsimError::NoData {
                symbol: symbol.to_string(),
            });
        }

        Ok(BarSeries::new(symbol, bars))
    }
}
