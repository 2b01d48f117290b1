//! Bar-by-bar portfolio simulator.
//!
//! Walks the bar series in order. Per bar: integrity check, indicator
//! lookup, signal, sizing/fill, then exactly one equity point. Entries and
//! signal exits fill at the bar's close. Under the intrabar policy stops
//! fill at `min(open, stop)` and profit targets at `max(open, target)`, so a
//! gap through either level fills at the open.

use tracing::{debug, info, info_span};

use super::bar::{check_bar, Bar, BarSeries};
use super::config::{EngineConfig, StopPolicy};
use super::error::TrendsimError;
use super::indicator::IndicatorSet;
use super::portfolio::{EquityPoint, SimulationState};
use super::position::{ExitReason, Position, TradeRecord};
use super::signal::{self, Decision, IndicatorSnapshot, SignalRules};
use super::sizing::{self, SizingParams};

/// Everything one completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub symbol: String,
    pub config: EngineConfig,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    /// Still open after the last bar; already marked into the final equity.
    pub open_position: Option<Position>,
    pub final_cash: f64,
}

impl SimulationResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.config.initial_cash)
    }
}

pub fn exit_fill_price(
    bar: &Bar,
    stop_price: f64,
    target_price: Option<f64>,
    reason: ExitReason,
    policy: StopPolicy,
) -> f64 {
    match (reason, policy) {
        (ExitReason::Stop, StopPolicy::Intrabar) => bar.open.min(stop_price),
        (ExitReason::Target, StopPolicy::Intrabar) => {
            target_price.map_or(bar.close, |target| bar.open.max(target))
        }
        _ => bar.close,
    }
}

#[derive(Debug, Clone)]
pub struct Simulator {
    config: EngineConfig,
    rules: SignalRules,
    sizing: SizingParams,
}

impl Simulator {
    /// Rejects an invalid configuration before any bar is seen.
    pub fn new(config: EngineConfig) -> Result<Self, TrendsimError> {
        config.validate()?;
        Ok(Simulator {
            rules: SignalRules::from(&config),
            sizing: SizingParams::from(&config),
            config,
        })
    }

    /// Runs over `bars` using precomputed `indicators`, which must hold
    /// every series the configuration needs, aligned with `bars`.
    ///
    /// A malformed bar aborts the run; no partial result is returned.
    pub fn run(
        &self,
        bars: &BarSeries,
        indicators: &IndicatorSet,
    ) -> Result<SimulationResult, TrendsimError> {
        let _span = info_span!(
            "simulate",
            symbol = %bars.symbol(),
            fast = self.config.fast_window,
            slow = self.config.slow_window,
            stop_mult = self.config.stop_multiplier
        )
        .entered();

        for t in self.config.required_indicators() {
            match indicators.get(t) {
                Some(series) if series.len() == bars.len() => {}
                Some(series) => {
                    return Err(TrendsimError::Data {
                        reason: format!(
                            "{} has {} values for {} bars",
                            t,
                            series.len(),
                            bars.len()
                        ),
                    });
                }
                None => {
                    return Err(TrendsimError::Data {
                        reason: format!("{} was not computed", t),
                    });
                }
            }
        }

        let mut state = SimulationState::new(self.config.initial_cash);
        let mut prior: Option<IndicatorSnapshot> = None;
        let mut prev_bar: Option<&Bar> = None;

        for (i, bar) in bars.bars().iter().enumerate() {
            check_bar(i, bar, prev_bar)?;

            let current = IndicatorSnapshot::at(indicators, &self.config, i);
            let signal = signal::generate(
                state.market_state(i),
                prior.as_ref(),
                &current,
                bar,
                &self.rules,
            );

            match signal.decision {
                Decision::EnterLong => self.enter(&mut state, i, bar, &current),
                Decision::ExitLong(reason) => self.exit(&mut state, i, bar, reason),
                Decision::Hold => {}
            }

            state.record_equity(bar.timestamp, bar.close);
            prior = Some(current);
            prev_bar = Some(bar);
        }

        let result = SimulationResult {
            symbol: bars.symbol().to_string(),
            config: self.config.clone(),
            final_cash: state.cash,
            open_position: state.position,
            trades: state.trades,
            equity_curve: state.equity_curve,
        };

        info!(
            bars = bars.len(),
            trades = result.trades.len(),
            final_equity = result.final_equity(),
            "simulation complete"
        );
        Ok(result)
    }

    fn enter(
        &self,
        state: &mut SimulationState,
        index: usize,
        bar: &Bar,
        current: &IndicatorSnapshot,
    ) {
        match sizing::size_entry(state.cash, bar.close, current.atr, &self.sizing) {
            Ok(entry) => {
                if state.open_position(index, bar.timestamp, &entry) {
                    debug!(
                        index,
                        timestamp = %bar.timestamp,
                        quantity = entry.quantity,
                        price = entry.entry_price,
                        stop = entry.stop_price,
                        "entered long"
                    );
                }
            }
            Err(rejection) => {
                debug!(index, timestamp = %bar.timestamp, ?rejection, "entry rejected");
            }
        }
    }

    fn exit(&self, state: &mut SimulationState, index: usize, bar: &Bar, reason: ExitReason) {
        let Some((stop_price, target_price)) = state
            .position
            .as_ref()
            .map(|p| (p.stop_price, p.target_price))
        else {
            return;
        };
        let price = exit_fill_price(bar, stop_price, target_price, reason, self.config.stop_policy);
        if let Some(trade) = state.close_position(
            index,
            bar.timestamp,
            price,
            self.config.commission_rate,
            reason,
        ) {
            debug!(
                index,
                timestamp = %bar.timestamp,
                %reason,
                price,
                pnl = trade.pnl,
                "exited long"
            );
        }
    }
}

/// Validates `config`, computes the indicators it needs, and runs once.
pub fn run_backtest(
    bars: &BarSeries,
    config: &EngineConfig,
) -> Result<SimulationResult, TrendsimError> {
    let simulator = Simulator::new(config.clone())?;
    let indicators = IndicatorSet::compute(bars.bars(), &config.required_indicators());
    simulator.run(bars, &indicators)
}
