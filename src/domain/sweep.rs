//! Parallel parameter sweeps over one bar series.
//!
//! Every indicator series any configuration needs is computed into a single
//! `IndicatorSet` before the first run starts; runs then share the bars and
//! the set read-only, each with its own simulation state.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::bar::BarSeries;
use super::config::EngineConfig;
use super::error::TrendsimError;
use super::indicator::{IndicatorSet, IndicatorType};
use super::metrics::Metrics;
use super::simulator::{SimulationResult, Simulator};

#[derive(Debug)]
pub struct SweepRun {
    pub config: EngineConfig,
    pub outcome: Result<(SimulationResult, Metrics), TrendsimError>,
}

impl SweepRun {
    pub fn metrics(&self) -> Option<&Metrics> {
        self.outcome.as_ref().ok().map(|(_, m)| m)
    }
}

/// Cartesian product of windows and stop multipliers over `base`.
/// Combinations with `fast >= slow` are skipped here only; a single
/// configuration may order its windows either way.
pub fn grid(
    base: &EngineConfig,
    fast_windows: &[usize],
    slow_windows: &[usize],
    stop_multipliers: &[f64],
) -> Vec<EngineConfig> {
    let mut configs = Vec::new();
    for &fast in fast_windows {
        for &slow in slow_windows {
            if fast >= slow {
                debug!(fast, slow, "grid skips combination with fast >= slow");
                continue;
            }
            for &stop in stop_multipliers {
                configs.push(EngineConfig {
                    fast_window: fast,
                    slow_window: slow,
                    stop_multiplier: stop,
                    ..base.clone()
                });
            }
        }
    }
    configs
}

/// Runs every configuration over `bars`, results in input order.
///
/// The bars are checked once up front; a malformed series fails the whole
/// sweep. An invalid configuration fails only its own run.
pub fn run_sweep(
    bars: &BarSeries,
    configs: &[EngineConfig],
) -> Result<Vec<SweepRun>, TrendsimError> {
    bars.validate()?;

    let mut types: Vec<IndicatorType> = configs
        .iter()
        .flat_map(|c| c.required_indicators())
        .collect();
    types.sort();
    types.dedup();
    let indicators = IndicatorSet::compute(bars.bars(), &types);

    info!(
        runs = configs.len(),
        indicators = indicators.len(),
        bars = bars.len(),
        "starting sweep"
    );

    let runs = configs
        .par_iter()
        .map(|config| {
            let outcome = Simulator::new(config.clone())
                .and_then(|sim| sim.run(bars, &indicators))
                .map(|result| {
                    let metrics = Metrics::compute(
                        &result.equity_curve,
                        &result.trades,
                        config.periods_per_year,
                    );
                    (result, metrics)
                });
            if let Err(e) = &outcome {
                warn!(
                    fast = config.fast_window,
                    slow = config.slow_window,
                    error = %e,
                    "sweep run skipped"
                );
            }
            SweepRun {
                config: config.clone(),
                outcome,
            }
        })
        .collect();

    Ok(runs)
}
