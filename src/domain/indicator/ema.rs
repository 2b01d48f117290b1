//! Exponential Moving Average.
//!
//! alpha = 2/(n+1). Seeded with the mean of the first n closes, emitted on
//! bar n-1; then EMA[i] = EMA[i-1] + alpha * (C[i] - EMA[i-1]).

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_ema(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut ema: Option<f64> = None;
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if period > 0 {
            if i + 1 < period {
                sum += bar.close;
            } else if i + 1 == period {
                sum += bar.close;
                ema = Some(sum / period as f64);
            } else if let Some(prev) = ema {
                ema = Some(prev + alpha * (bar.close - prev));
            }
        }
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            value: ema,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}
