//! CSV report adapter: equity curve, trade log and summary per run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::error::TrendsimError;
use crate::domain::metrics::Metrics;
use crate::domain::simulator::SimulationResult;
use crate::domain::sweep::SweepRun;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const EQUITY_FILE: &str = "equity.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const SUMMARY_FILE: &str = "summary.csv";
pub const SWEEP_FILE: &str = "sweep.csv";

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn ensure_dir(&self) -> Result<(), TrendsimError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    fn writer(&self, name: &str) -> Result<csv::Writer<fs::File>, TrendsimError> {
        let path = self.output_dir.join(name);
        csv::Writer::from_path(&path).map_err(|e| report_error(&path, e))
    }

    fn write_equity(&self, result: &SimulationResult) -> Result<(), TrendsimError> {
        let path = self.output_dir.join(EQUITY_FILE);
        let mut wtr = self.writer(EQUITY_FILE)?;
        wtr.write_record(["timestamp", "cash", "position_value", "equity"])
            .map_err(|e| report_error(&path, e))?;
        for point in &result.equity_curve {
            wtr.write_record([
                point.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                point.cash.to_string(),
                point.position_value.to_string(),
                point.equity.to_string(),
            ])
            .map_err(|e| report_error(&path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_trades(&self, result: &SimulationResult) -> Result<(), TrendsimError> {
        let path = self.output_dir.join(TRADES_FILE);
        let mut wtr = self.writer(TRADES_FILE)?;
        wtr.write_record([
            "entry_timestamp",
            "exit_timestamp",
            "entry_price",
            "exit_price",
            "quantity",
            "commission",
            "pnl",
            "return_pct",
            "exit_reason",
            "bars_held",
        ])
        .map_err(|e| report_error(&path, e))?;
        for trade in &result.trades {
            wtr.write_record([
                trade.entry_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                trade.exit_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                trade.entry_price.to_string(),
                trade.exit_price.to_string(),
                trade.quantity.to_string(),
                trade.commission.to_string(),
                trade.pnl.to_string(),
                trade.return_pct().to_string(),
                trade.exit_reason.to_string(),
                trade.bars_held.to_string(),
            ])
            .map_err(|e| report_error(&path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(
        &self,
        result: &SimulationResult,
        metrics: &Metrics,
    ) -> Result<(), TrendsimError> {
        let path = self.output_dir.join(SUMMARY_FILE);
        let mut wtr = self.writer(SUMMARY_FILE)?;
        let open_quantity = result
            .open_position
            .as_ref()
            .map(|p| p.quantity)
            .unwrap_or(0);
        let rows: [(&str, String); 21] = [
            ("symbol", result.symbol.clone()),
            ("fast_window", result.config.fast_window.to_string()),
            ("slow_window", result.config.slow_window.to_string()),
            ("stop_multiplier", result.config.stop_multiplier.to_string()),
            (
                "target_multiplier",
                result.config.target_multiplier.to_string(),
            ),
            ("initial_equity", metrics.initial_equity.to_string()),
            ("final_equity", metrics.final_equity.to_string()),
            ("final_cash", result.final_cash.to_string()),
            ("open_quantity", open_quantity.to_string()),
            ("total_return", metrics.total_return.to_string()),
            ("max_drawdown", metrics.max_drawdown.to_string()),
            (
                "max_drawdown_duration",
                metrics.max_drawdown_duration.to_string(),
            ),
            ("sharpe_ratio", metrics.sharpe_ratio.to_string()),
            ("trade_count", metrics.trade_count.to_string()),
            ("trades_won", metrics.trades_won.to_string()),
            ("trades_lost", metrics.trades_lost.to_string()),
            ("win_rate", metrics.win_rate.to_string()),
            ("profit_factor", metrics.profit_factor.to_string()),
            ("avg_win", metrics.avg_win.to_string()),
            ("avg_loss", metrics.avg_loss.to_string()),
            ("exposure", metrics.exposure.to_string()),
        ];
        wtr.write_record(["metric", "value"])
            .map_err(|e| report_error(&path, e))?;
        for (name, value) in rows {
            wtr.write_record([name, value.as_str()])
                .map_err(|e| report_error(&path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn report_error(path: &Path, err: csv::Error) -> TrendsimError {
    TrendsimError::Report {
        reason: format!("{}: {err}", path.display()),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &SimulationResult, metrics: &Metrics) -> Result<(), TrendsimError> {
        self.ensure_dir()?;
        self.write_equity(result)?;
        self.write_trades(result)?;
        self.write_summary(result, metrics)?;
        info!(
            dir = %self.output_dir.display(),
            trades = result.trades.len(),
            "wrote report"
        );
        Ok(())
    }

    /// One row per configuration; failed runs keep their row with the error.
    fn write_sweep(&self, runs: &[SweepRun]) -> Result<(), TrendsimError> {
        self.ensure_dir()?;
        let path = self.output_dir.join(SWEEP_FILE);
        let mut wtr = self.writer(SWEEP_FILE)?;
        wtr.write_record([
            "fast_window",
            "slow_window",
            "stop_multiplier",
            "final_equity",
            "total_return",
            "max_drawdown",
            "sharpe_ratio",
            "trade_count",
            "win_rate",
            "error",
        ])
        .map_err(|e| report_error(&path, e))?;
        for run in runs {
            let mut row = vec![
                run.config.fast_window.to_string(),
                run.config.slow_window.to_string(),
                run.config.stop_multiplier.to_string(),
            ];
            match &run.outcome {
                Ok((_, m)) => row.extend([
                    m.final_equity.to_string(),
                    m.total_return.to_string(),
                    m.max_drawdown.to_string(),
                    m.sharpe_ratio.to_string(),
                    m.trade_count.to_string(),
                    m.win_rate.to_string(),
                    String::new(),
                ]),
                Err(e) => {
                    row.extend(std::iter::repeat_n(String::new(), 6));
                    row.push(e.to_string());
                }
            }
            wtr.write_record(&row).map_err(|e| report_error(&path, e))?;
        }
        wtr.flush()?;
        info!(dir = %self.output_dir.display(), runs = runs.len(), "wrote sweep report");
        Ok(())
    }
}
