//! EMA crossover signal generator.
//!
//! A pure function of (state, prior indicator values, current indicator
//! values, current bar). The caller owns the state; nothing is retained
//! between calls.
//!
//! # Decision Semantics
//!
//! - `Flat`: `EnterLong` on a true cross above (fast <= slow on the prior
//!   bar, fast > slow now). Needs both EMAs on both bars plus the ATR.
//! - `Long`: the stop is checked first, then the profit target, then the
//!   holding-period limit, then a cross below (fast >= slow on the prior
//!   bar, fast < slow now). A bar that touches both stop and target exits
//!   at the stop.
//! - Anything else, including an undefined indicator, is `Hold`.

use chrono::NaiveDateTime;

use super::bar::Bar;
use super::config::{EngineConfig, StopPolicy};
use super::indicator::IndicatorSet;
use super::position::ExitReason;

/// Indicator values for one bar, `None` where still warming up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorSnapshot {
    pub fast: Option<f64>,
    pub slow: Option<f64>,
    pub atr: Option<f64>,
}

impl IndicatorSnapshot {
    pub fn at(indicators: &IndicatorSet, config: &EngineConfig, index: usize) -> Self {
        IndicatorSnapshot {
            fast: indicators.value(config.fast_ema(), index),
            slow: indicators.value(config.slow_ema(), index),
            atr: indicators.value(config.atr(), index),
        }
    }

    fn emas(&self) -> Option<(f64, f64)> {
        Some((self.fast?, self.slow?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarketState {
    Flat,
    Long {
        stop_price: f64,
        target_price: Option<f64>,
        bars_held: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    EnterLong,
    ExitLong(ExitReason),
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub decision: Decision,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalRules {
    pub stop_policy: StopPolicy,
    /// 0 disables the holding-period exit.
    pub max_bars_in_trade: usize,
}

impl From<&EngineConfig> for SignalRules {
    fn from(config: &EngineConfig) -> Self {
        SignalRules {
            stop_policy: config.stop_policy,
            max_bars_in_trade: config.max_bars_in_trade,
        }
    }
}

pub fn stop_triggered(bar: &Bar, stop_price: f64, policy: StopPolicy) -> bool {
    match policy {
        StopPolicy::Intrabar => bar.low <= stop_price,
        StopPolicy::Close => bar.close <= stop_price,
    }
}

/// Mirror of `stop_triggered` on the upside: the high (or the close) has
/// reached the target.
pub fn target_reached(bar: &Bar, target_price: f64, policy: StopPolicy) -> bool {
    match policy {
        StopPolicy::Intrabar => bar.high >= target_price,
        StopPolicy::Close => bar.close >= target_price,
    }
}

pub fn generate(
    state: MarketState,
    prior: Option<&IndicatorSnapshot>,
    current: &IndicatorSnapshot,
    bar: &Bar,
    rules: &SignalRules,
) -> Signal {
    let decision = decide(state, prior, current, bar, rules);
    Signal {
        decision,
        timestamp: bar.timestamp,
    }
}

fn decide(
    state: MarketState,
    prior: Option<&IndicatorSnapshot>,
    current: &IndicatorSnapshot,
    bar: &Bar,
    rules: &SignalRules,
) -> Decision {
    let emas = prior.and_then(|p| p.emas()).zip(current.emas());

    match state {
        MarketState::Flat => {
            let Some(((prev_fast, prev_slow), (fast, slow))) = emas else {
                return Decision::Hold;
            };
            if current.atr.is_none() {
                return Decision::Hold;
            }
            if prev_fast <= prev_slow && fast > slow {
                Decision::EnterLong
            } else {
                Decision::Hold
            }
        }
        MarketState::Long {
            stop_price,
            target_price,
            bars_held,
        } => {
            if stop_triggered(bar, stop_price, rules.stop_policy) {
                return Decision::ExitLong(ExitReason::Stop);
            }
            if target_price.is_some_and(|t| target_reached(bar, t, rules.stop_policy)) {
                return Decision::ExitLong(ExitReason::Target);
            }
            if rules.max_bars_in_trade > 0 && bars_held >= rules.max_bars_in_trade {
                return Decision::ExitLong(ExitReason::Time);
            }
            match emas {
                Some(((prev_fast, prev_slow), (fast, slow)))
                    if prev_fast >= prev_slow && fast < slow =>
                {
                    Decision::ExitLong(ExitReason::Signal)
                }
                _ => Decision::Hold,
            }
        }
    }
}
