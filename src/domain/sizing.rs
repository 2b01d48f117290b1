//! Position sizing for long entries.
//!
//! Budget is `cash * allocation_fraction`; quantity is whole shares only,
//! priced at the close plus commission; the protective stop sits
//! `stop_multiplier` ATRs below the close and the optional profit target
//! `target_multiplier` ATRs above it.

use super::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingParams {
    pub allocation_fraction: f64,
    pub stop_multiplier: f64,
    /// 0 disables the profit target.
    pub target_multiplier: f64,
    pub commission_rate: f64,
}

impl From<&EngineConfig> for SizingParams {
    fn from(config: &EngineConfig) -> Self {
        SizingParams {
            allocation_fraction: config.allocation_fraction,
            stop_multiplier: config.stop_multiplier,
            target_multiplier: config.target_multiplier,
            commission_rate: config.commission_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizedEntry {
    pub quantity: u64,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: Option<f64>,
    /// quantity * entry_price
    pub cost: f64,
    pub commission: f64,
}

impl SizedEntry {
    pub fn total_cost(&self) -> f64 {
        self.cost + self.commission
    }
}

/// Why an entry was not sized. The simulator treats both as a hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingRejection {
    /// Budget does not cover a single share.
    InsufficientCapital,
    /// ATR undefined, zero, or not finite: no stop, so no entry.
    UndefinedVolatility,
}

pub fn calculate_commission(notional: f64, commission_rate: f64) -> f64 {
    notional * commission_rate
}

pub fn size_entry(
    cash: f64,
    close: f64,
    atr: Option<f64>,
    params: &SizingParams,
) -> Result<SizedEntry, SizingRejection> {
    let atr = match atr {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => return Err(SizingRejection::UndefinedVolatility),
    };

    let budget = cash * params.allocation_fraction;
    let per_share = close * (1.0 + params.commission_rate);
    let mut quantity = (budget / per_share).floor() as u64;

    // Rounding in the budget division must never overdraw cash.
    while quantity > 0 {
        let cost = quantity as f64 * close;
        if cost + calculate_commission(cost, params.commission_rate) <= cash {
            break;
        }
        quantity -= 1;
    }

    if quantity == 0 {
        return Err(SizingRejection::InsufficientCapital);
    }

    let cost = quantity as f64 * close;
    Ok(SizedEntry {
        quantity,
        entry_price: close,
        stop_price: close - params.stop_multiplier * atr,
        target_price: (params.target_multiplier > 0.0)
            .then(|| close + params.target_multiplier * atr),
        cost,
        commission: calculate_commission(cost, params.commission_rate),
    })
}
