//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{parse_timestamp, CsvAdapter};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::bar::BarSeries;
use crate::domain::config::EngineConfig;
use crate::domain::error::TrendsimError;
use crate::domain::metrics::Metrics;
use crate::domain::simulator::{run_backtest, SimulationResult};
use crate::domain::sweep::{self, SweepRun};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const LOG_ENV: &str = "TRENDSIM_LOG";
pub const DEFAULT_TIMEFRAME: &str = "1d";
pub const DEFAULT_OUTPUT_DIR: &str = "report";

#[derive(Parser, Debug)]
#[command(name = "trendsim", about = "EMA crossover backtester")]
pub struct Cli {
    /// Log output format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single backtest and write the report
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>_<TIMEFRAME>.csv files
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without reading any data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run a parameter grid in parallel
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_delimiter = ',', required = true)]
        fast: Vec<usize>,
        #[arg(long, value_delimiter = ',', required = true)]
        slow: Vec<usize>,
        /// Stop multipliers; defaults to the configured one
        #[arg(long, value_delimiter = ',')]
        stop: Vec<f64>,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Dispatches a parsed command. Logging is installed by the caller.
pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            symbol,
            output,
        } => run_backtest_command(&config, data, symbol, output),
        Command::Validate { config } => run_validate(&config),
        Command::Sweep {
            config,
            fast,
            slow,
            stop,
            data,
            symbol,
            output,
        } => run_sweep_command(&config, &fast, &slow, &stop, data, symbol, output),
    }
}

/// `TRENDSIM_LOG` takes an `EnvFilter` directive; the default is `info`.
pub fn init_tracing(format: LogFormat) -> Result<(), String> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    result.map_err(|err| format!("failed to install logger: {err}"))
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| fail(&err))
}

fn fail(err: &TrendsimError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

/// Where the bars come from: the `[data]` section, with command-line
/// overrides for the directory and the symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub path: PathBuf,
    pub symbol: String,
    pub timeframe: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DataSettings {
    pub fn from_config(
        config: &dyn ConfigPort,
        path_override: Option<PathBuf>,
        symbol_override: Option<String>,
    ) -> Result<Self, TrendsimError> {
        let path = path_override
            .or_else(|| config.get_string("data", "path").map(PathBuf::from))
            .ok_or_else(|| missing("data", "path"))?;
        let symbol = symbol_override
            .or_else(|| config.get_string("data", "symbol"))
            .ok_or_else(|| missing("data", "symbol"))?;
        let timeframe = config
            .get_string("data", "timeframe")
            .unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string());
        let start = read_timestamp(config, "start")?;
        let end = read_timestamp(config, "end")?;

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(TrendsimError::invalid("data", "start", "start is after end"));
            }
        }

        Ok(DataSettings {
            path,
            symbol,
            timeframe,
            start,
            end,
        })
    }

    pub fn fetch(&self, port: &dyn DataPort) -> Result<BarSeries, TrendsimError> {
        port.fetch_bars(&self.symbol, &self.timeframe, self.start, self.end)
    }
}

fn missing(section: &str, key: &str) -> TrendsimError {
    TrendsimError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn read_timestamp(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<NaiveDateTime>, TrendsimError> {
    match config.get_string("data", key) {
        Some(raw) => parse_timestamp(&raw).map(Some).ok_or_else(|| {
            TrendsimError::invalid(
                "data",
                key,
                format!("'{raw}' is not a date (expected YYYY-MM-DD[ HH:MM:SS])"),
            )
        }),
        None => Ok(None),
    }
}

pub fn output_dir(config: &dyn ConfigPort, output_override: Option<PathBuf>) -> PathBuf {
    output_override
        .or_else(|| config.get_string("report", "output_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

/// Fetch, simulate, score, report. Any failure aborts before the report
/// is written.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    engine: &EngineConfig,
    settings: &DataSettings,
) -> Result<(SimulationResult, Metrics), TrendsimError> {
    let bars = settings.fetch(data_port)?;
    eprintln!(
        "Running backtest: {} ({} bars, EMA {}/{}, stop {} x ATR({}))",
        bars.symbol(),
        bars.len(),
        engine.fast_window,
        engine.slow_window,
        engine.stop_multiplier,
        engine.atr_window,
    );

    let result = run_backtest(&bars, engine)?;
    let metrics = Metrics::compute(&result.equity_curve, &result.trades, engine.periods_per_year);
    report_port.write(&result, &metrics)?;
    Ok((result, metrics))
}

fn run_backtest_command(
    config_path: &Path,
    data: Option<PathBuf>,
    symbol: Option<String>,
    output: Option<PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let engine = match EngineConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let settings = match DataSettings::from_config(&adapter, data, symbol) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let out = output_dir(&adapter, output);

    let data_port = CsvAdapter::new(settings.path.clone());
    let report_port = CsvReportAdapter::new(&out);
    match run_backtest_pipeline(&data_port, &report_port, &engine, &settings) {
        Ok((result, metrics)) => {
            print_summary(&result, &metrics);
            eprintln!("\nReport written to: {}", out.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub fn print_summary(result: &SimulationResult, metrics: &Metrics) {
    eprintln!("\n=== Results: {} ===", result.symbol);
    eprintln!("Initial Equity:   {:.2}", metrics.initial_equity);
    eprintln!("Final Equity:     {:.2}", metrics.final_equity);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Total Trades:     {}", metrics.trade_count);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!("Exposure:         {:.1}%", metrics.exposure * 100.0);
    if let Some(pos) = &result.open_position {
        eprintln!(
            "Open Position:    {} @ {:.2} (stop {:.2}) since {}",
            pos.quantity, pos.entry_price, pos.stop_price, pos.entry_timestamp
        );
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match EngineConfig::from_config(&adapter) {
        Ok(c) => {
            eprintln!("Configuration is valid.");
            eprintln!("  EMA:          {}/{}", c.fast_window, c.slow_window);
            eprintln!("  ATR:          {}", c.atr_window);
            eprintln!("  Allocation:   {:.1}%", c.allocation_fraction * 100.0);
            eprintln!("  Stop:         {} x ATR ({})", c.stop_multiplier, c.stop_policy);
            if c.target_multiplier > 0.0 {
                eprintln!("  Target:       {} x ATR", c.target_multiplier);
            }
            if c.max_bars_in_trade > 0 {
                eprintln!("  Max bars:     {}", c.max_bars_in_trade);
            }
            eprintln!("  Initial cash: {:.2}", c.initial_cash);
            eprintln!("  Commission:   {:.3}%", c.commission_rate * 100.0);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Builds the sweep grid from the configured base; an empty stop list
/// keeps the base multiplier.
pub fn build_grid(
    base: &EngineConfig,
    fast: &[usize],
    slow: &[usize],
    stop: &[f64],
) -> Result<Vec<EngineConfig>, TrendsimError> {
    let stops: Vec<f64> = if stop.is_empty() {
        vec![base.stop_multiplier]
    } else {
        stop.to_vec()
    };
    let configs = sweep::grid(base, fast, slow, &stops);
    if configs.is_empty() {
        return Err(TrendsimError::Argument {
            name: "--fast/--slow".to_string(),
            reason: format!(
                "no combination with fast < slow in --fast {fast:?} and --slow {slow:?}"
            ),
        });
    }
    Ok(configs)
}

pub fn run_sweep_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    configs: &[EngineConfig],
    settings: &DataSettings,
) -> Result<Vec<SweepRun>, TrendsimError> {
    let bars = settings.fetch(data_port)?;
    eprintln!(
        "Running sweep: {} ({} bars, {} configurations)",
        bars.symbol(),
        bars.len(),
        configs.len()
    );
    let runs = sweep::run_sweep(&bars, configs)?;
    report_port.write_sweep(&runs)?;
    Ok(runs)
}

fn run_sweep_command(
    config_path: &Path,
    fast: &[usize],
    slow: &[usize],
    stop: &[f64],
    data: Option<PathBuf>,
    symbol: Option<String>,
    output: Option<PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let base = match EngineConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let configs = match build_grid(&base, fast, slow, stop) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let settings = match DataSettings::from_config(&adapter, data, symbol) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let out = output_dir(&adapter, output);

    let data_port = CsvAdapter::new(settings.path.clone());
    let report_port = CsvReportAdapter::new(&out);
    let runs = match run_sweep_pipeline(&data_port, &report_port, &configs, &settings) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    eprintln!("\n=== Sweep Results ===");
    eprintln!(
        "  {:>5} {:>5} {:>6}  {:>10} {:>8} {:>7}",
        "fast", "slow", "stop", "return", "maxdd", "trades"
    );
    for run in &runs {
        match &run.outcome {
            Ok((_, m)) => eprintln!(
                "  {:>5} {:>5} {:>6.2}  {:>9.2}% {:>7.1}% {:>7}",
                run.config.fast_window,
                run.config.slow_window,
                run.config.stop_multiplier,
                m.total_return * 100.0,
                m.max_drawdown * 100.0,
                m.trade_count,
            ),
            Err(e) => eprintln!(
                "  {:>5} {:>5} {:>6.2}  failed: {e}",
                run.config.fast_window, run.config.slow_window, run.config.stop_multiplier,
            ),
        }
    }
    let best = runs
        .iter()
        .filter_map(|r| r.metrics().map(|m| (r, m)))
        .max_by(|a, b| a.1.total_return.total_cmp(&b.1.total_return));
    if let Some((run, m)) = best {
        eprintln!(
            "\nBest: EMA {}/{} stop {} ({:.2}%)",
            run.config.fast_window,
            run.config.slow_window,
            run.config.stop_multiplier,
            m.total_return * 100.0
        );
    }
    eprintln!("\nReport written to: {}", out.display());

    match runs.iter().find_map(|r| r.outcome.as_ref().err()) {
        Some(e) if runs.iter().all(|r| r.outcome.is_err()) => fail(e),
        _ => ExitCode::SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sweep_lists() {
        let cli = Cli::try_parse_from([
            "trendsim", "sweep", "-c", "x.ini", "--fast", "20,50", "--slow", "100,200", "--stop",
            "4,8",
        ])
        .unwrap();
        match cli.command {
            Command::Sweep {
                fast, slow, stop, ..
            } => {
                assert_eq!(fast, vec![20, 50]);
                assert_eq!(slow, vec![100, 200]);
                assert_eq!(stop, vec![4.0, 8.0]);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn parses_log_format_after_subcommand() {
        let cli =
            Cli::try_parse_from(["trendsim", "validate", "-c", "x.ini", "--log-format", "json"])
                .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn data_settings_from_config() {
        let cfg = adapter(
            "[data]\npath = /data\nsymbol = SPY\ntimeframe = 1h\nstart = 2020-01-01\nend = 2020-12-31 16:00:00\n",
        );
        let s = DataSettings::from_config(&cfg, None, None).unwrap();
        assert_eq!(s.path, PathBuf::from("/data"));
        assert_eq!(s.symbol, "SPY");
        assert_eq!(s.timeframe, "1h");
        assert_eq!(s.start, parse_timestamp("2020-01-01 00:00:00"));
        assert_eq!(s.end, parse_timestamp("2020-12-31 16:00:00"));
    }

    #[test]
    fn data_settings_overrides_win() {
        let cfg = adapter("[data]\npath = /data\nsymbol = SPY\n");
        let s = DataSettings::from_config(&cfg, Some(PathBuf::from("/other")), Some("QQQ".into()))
            .unwrap();
        assert_eq!(s.path, PathBuf::from("/other"));
        assert_eq!(s.symbol, "QQQ");
        assert_eq!(s.timeframe, DEFAULT_TIMEFRAME);
        assert_eq!(s.start, None);
    }

    #[test]
    fn data_settings_requires_symbol() {
        let cfg = adapter("[data]\npath = /data\n");
        let err = DataSettings::from_config(&cfg, None, None).unwrap_err();
        assert!(matches!(err, TrendsimError::ConfigMissing { ref key, .. } if key == "symbol"));
    }

    #[test]
    fn data_settings_rejects_bad_dates() {
        let cfg = adapter("[data]\npath = /d\nsymbol = S\nstart = yesterday\n");
        let err = DataSettings::from_config(&cfg, None, None).unwrap_err();
        assert!(matches!(err, TrendsimError::ConfigInvalid { ref key, .. } if key == "start"));

        let cfg = adapter("[data]\npath = /d\nsymbol = S\nstart = 2021-01-01\nend = 2020-01-01\n");
        assert!(DataSettings::from_config(&cfg, None, None).is_err());
    }

    #[test]
    fn output_dir_precedence() {
        let cfg = adapter("[report]\noutput_dir = out/runs\n");
        assert_eq!(output_dir(&cfg, None), PathBuf::from("out/runs"));
        assert_eq!(
            output_dir(&cfg, Some(PathBuf::from("cli"))),
            PathBuf::from("cli")
        );
        assert_eq!(output_dir(&adapter(""), None), PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn build_grid_defaults_stop_and_rejects_empty() {
        let base = EngineConfig::new(1000.0);
        let configs = build_grid(&base, &[10, 20], &[50], &[]).unwrap();
        assert_eq!(configs.len(), 2);
        assert!(configs
            .iter()
            .all(|c| (c.stop_multiplier - base.stop_multiplier).abs() < f64::EPSILON));

        let err = build_grid(&base, &[100], &[50], &[]).unwrap_err();
        match err {
            TrendsimError::Argument { name, reason } => {
                assert_eq!(name, "--fast/--slow");
                assert!(reason.contains("[100]") && reason.contains("[50]"), "{reason}");
            }
            other => panic!("expected argument error, got {other:?}"),
        }
    }
}
