//! Engine configuration: defaults, validation, and loading from a
//! [`ConfigPort`].
//!
//! Validation runs before any bar is read; an invalid configuration never
//! starts a run.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::TrendsimError;
use crate::domain::indicator::IndicatorType;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_FAST_WINDOW: usize = 50;
pub const DEFAULT_SLOW_WINDOW: usize = 200;
pub const DEFAULT_ATR_WINDOW: usize = 14;
pub const DEFAULT_ALLOCATION_FRACTION: f64 = 0.95;
pub const DEFAULT_STOP_MULTIPLIER: f64 = 8.0;
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

const STRATEGY: &str = "strategy";
const BACKTEST: &str = "backtest";

/// Which price triggers and fills a protective stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    /// Trigger on `low <= stop`, fill at `min(open, stop)`.
    #[default]
    Intrabar,
    /// Trigger on `close <= stop`, fill at the close.
    Close,
}

impl FromStr for StopPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intrabar" => Ok(StopPolicy::Intrabar),
            "close" => Ok(StopPolicy::Close),
            other => Err(format!(
                "unknown stop policy '{other}', expected 'intrabar' or 'close'"
            )),
        }
    }
}

impl fmt::Display for StopPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopPolicy::Intrabar => write!(f, "intrabar"),
            StopPolicy::Close => write!(f, "close"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub fast_window: usize,
    pub slow_window: usize,
    pub atr_window: usize,
    pub allocation_fraction: f64,
    pub stop_multiplier: f64,
    /// Profit target distance in ATRs; 0 disables the target.
    pub target_multiplier: f64,
    /// Applies to the profit target as well as the stop.
    pub stop_policy: StopPolicy,
    /// 0 disables the holding-period exit.
    pub max_bars_in_trade: usize,
    pub initial_cash: f64,
    /// Fraction of notional charged on every fill.
    pub commission_rate: f64,
    pub periods_per_year: f64,
}

impl EngineConfig {
    /// Defaults for everything except the starting cash, which has none.
    pub fn new(initial_cash: f64) -> Self {
        EngineConfig {
            fast_window: DEFAULT_FAST_WINDOW,
            slow_window: DEFAULT_SLOW_WINDOW,
            atr_window: DEFAULT_ATR_WINDOW,
            allocation_fraction: DEFAULT_ALLOCATION_FRACTION,
            stop_multiplier: DEFAULT_STOP_MULTIPLIER,
            target_multiplier: 0.0,
            stop_policy: StopPolicy::Intrabar,
            max_bars_in_trade: 0,
            initial_cash,
            commission_rate: 0.0,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }

    pub fn fast_ema(&self) -> IndicatorType {
        IndicatorType::Ema(self.fast_window)
    }

    pub fn slow_ema(&self) -> IndicatorType {
        IndicatorType::Ema(self.slow_window)
    }

    pub fn atr(&self) -> IndicatorType {
        IndicatorType::Atr(self.atr_window)
    }

    /// Every indicator series a run with this configuration reads.
    pub fn required_indicators(&self) -> [IndicatorType; 3] {
        [self.fast_ema(), self.slow_ema(), self.atr()]
    }

    pub fn validate(&self) -> Result<(), TrendsimError> {
        for (key, window) in [
            ("fast_window", self.fast_window),
            ("slow_window", self.slow_window),
            ("atr_window", self.atr_window),
        ] {
            if window == 0 {
                return Err(TrendsimError::invalid(
                    STRATEGY,
                    key,
                    format!("{key} must be positive"),
                ));
            }
        }
        if !(self.allocation_fraction > 0.0 && self.allocation_fraction <= 1.0) {
            return Err(TrendsimError::invalid(
                STRATEGY,
                "allocation_fraction",
                "allocation_fraction must be in (0, 1]",
            ));
        }
        if !(self.stop_multiplier.is_finite() && self.stop_multiplier > 0.0) {
            return Err(TrendsimError::invalid(
                STRATEGY,
                "stop_multiplier",
                "stop_multiplier must be positive",
            ));
        }
        if !(self.target_multiplier.is_finite() && self.target_multiplier >= 0.0) {
            return Err(TrendsimError::invalid(
                STRATEGY,
                "target_multiplier",
                "target_multiplier must be zero (off) or positive",
            ));
        }
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(TrendsimError::invalid(
                BACKTEST,
                "initial_cash",
                "initial_cash must be positive",
            ));
        }
        if !(self.commission_rate >= 0.0 && self.commission_rate < 1.0) {
            return Err(TrendsimError::invalid(
                BACKTEST,
                "commission_rate",
                "commission_rate must be in [0, 1)",
            ));
        }
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(TrendsimError::invalid(
                BACKTEST,
                "periods_per_year",
                "periods_per_year must be positive",
            ));
        }
        Ok(())
    }

    /// Builds and validates a configuration from `[strategy]` and
    /// `[backtest]`. Unset keys take their defaults; `initial_cash` is
    /// required.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TrendsimError> {
        let initial_cash = match config.get_string(BACKTEST, "initial_cash") {
            Some(raw) => parse_double(BACKTEST, "initial_cash", &raw)?,
            None => {
                return Err(TrendsimError::ConfigMissing {
                    section: BACKTEST.to_string(),
                    key: "initial_cash".to_string(),
                })
            }
        };

        let stop_policy = match config.get_string(STRATEGY, "stop_policy") {
            Some(raw) => raw
                .parse()
                .map_err(|reason: String| TrendsimError::invalid(STRATEGY, "stop_policy", reason))?,
            None => StopPolicy::default(),
        };

        let engine = EngineConfig {
            fast_window: read_count(config, STRATEGY, "fast_window", DEFAULT_FAST_WINDOW)?,
            slow_window: read_count(config, STRATEGY, "slow_window", DEFAULT_SLOW_WINDOW)?,
            atr_window: read_count(config, STRATEGY, "atr_window", DEFAULT_ATR_WINDOW)?,
            allocation_fraction: read_double(
                config,
                STRATEGY,
                "allocation_fraction",
                DEFAULT_ALLOCATION_FRACTION,
            )?,
            stop_multiplier: read_double(
                config,
                STRATEGY,
                "stop_multiplier",
                DEFAULT_STOP_MULTIPLIER,
            )?,
            target_multiplier: read_double(config, STRATEGY, "target_multiplier", 0.0)?,
            stop_policy,
            max_bars_in_trade: read_count(config, STRATEGY, "max_bars_in_trade", 0)?,
            initial_cash,
            commission_rate: read_double(config, BACKTEST, "commission_rate", 0.0)?,
            periods_per_year: read_double(
                config,
                BACKTEST,
                "periods_per_year",
                DEFAULT_PERIODS_PER_YEAR,
            )?,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// Unset keys take the default; a value that does not parse is an error.
fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TrendsimError> {
    match config.get_string(section, key) {
        Some(raw) => parse_double(section, key, &raw),
        None => Ok(default),
    }
}

fn parse_double(section: &str, key: &str, raw: &str) -> Result<f64, TrendsimError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| TrendsimError::invalid(section, key, format!("'{raw}' is not a number")))
}

fn read_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, TrendsimError> {
    match config.get_string(section, key) {
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            TrendsimError::invalid(
                section,
                key,
                format!("'{raw}' is not a non-negative integer"),
            )
        }),
        None => Ok(default),
    }
}
