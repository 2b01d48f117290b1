//! Performance statistics over a finished run.
//!
//! Pure functions of the equity curve and the trade log; inputs are never
//! mutated.

use super::portfolio::EquityPoint;
use super::position::TradeRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub total_return: f64,
    /// Largest decline from a running peak, as a fraction of that peak.
    pub max_drawdown: f64,
    /// Longest run of bars spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: f64,
    pub trade_count: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_bars_held: f64,
    /// Fraction of bars with an open position.
    pub exposure: f64,
}

impl Metrics {
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[TradeRecord],
        periods_per_year: f64,
    ) -> Self {
        let initial_equity = equity_curve.first().map(|p| p.equity).unwrap_or(0.0);
        let final_equity = equity_curve.last().map(|p| p.equity).unwrap_or(0.0);

        let total_return = if initial_equity > 0.0 {
            final_equity / initial_equity - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let sharpe_ratio = compute_sharpe(equity_curve, periods_per_year);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_bars_held = 0usize;

        for trade in trades {
            let pnl = trade.pnl;
            if trade.is_win() {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
            total_bars_held += trade.bars_held;
        }

        let trade_count = trades.len();
        let win_rate = if trade_count > 0 {
            trades_won as f64 / trade_count as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        let avg_bars_held = if trade_count > 0 {
            total_bars_held as f64 / trade_count as f64
        } else {
            0.0
        };

        let exposure = if equity_curve.is_empty() {
            0.0
        } else {
            let in_market = equity_curve
                .iter()
                .filter(|p| p.position_value > 0.0)
                .count();
            in_market as f64 / equity_curve.len() as f64
        };

        Metrics {
            initial_equity,
            final_equity,
            total_return,
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio,
            trade_count,
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_bars_held,
            exposure,
        }
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut current_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}

fn compute_sharpe(equity_curve: &[EquityPoint], periods_per_year: f64) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        mean / stddev * periods_per_year.sqrt()
    } else {
        0.0
    }
}
