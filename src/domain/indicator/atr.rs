//! Average True Range with Wilder smoothing.
//!
//! TR needs a previous close, so TR[0] does not exist. The seed is the mean
//! of TR[1..=n], emitted on bar n; then ATR[i] = (ATR[i-1]*(n-1) + TR[i]) / n.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let n = period as f64;
    let mut atr: Option<f64> = None;
    let mut tr_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if period > 0 && i > 0 {
            let tr = bar.true_range(bars[i - 1].close);
            if i < period {
                tr_sum += tr;
            } else if i == period {
                tr_sum += tr;
                atr = Some(tr_sum / n);
            } else if let Some(prev) = atr {
                atr = Some((prev * (n - 1.0) + tr) / n);
            }
        }
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            value: atr,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
