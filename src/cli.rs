//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as engine, BacktestConfig, DEFAULT_REBALANCE_PERIOD};
use crate::domain::config_validation::{parse_date, parse_strategy, validate_backtest_config};
use crate::domain::error::RebalancerError;
use crate::domain::metrics::{self, PerformanceSummary, ReturnTable};
use crate::domain::price_panel::PricePanel;
use crate::domain::strategy::StrategyKind;
use crate::domain::weights::WeightMapping;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{ReportPort, RunReport};

#[derive(Parser, Debug)]
#[command(name = "rebalancer", about = "Periodic portfolio rebalancing backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a rebalancing backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override `[backtest] strategy`
        #[arg(short, long)]
        strategy: Option<StrategyKind>,
        /// Override `[backtest] rebalance_period` (trading days)
        #[arg(short, long)]
        period: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a configuration and its data without running
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the date range and assets of the configured price panel
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            strategy,
            period,
            output,
        } => run_backtest(&config, strategy, period, output.as_ref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = RebalancerError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: RebalancerError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn run_backtest(
    config_path: &Path,
    strategy_override: Option<StrategyKind>,
    period_override: Option<usize>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(e);
    }

    // Stage 2: Build run parameters
    let mut bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Some(period) = period_override {
        if period == 0 {
            return fail(RebalancerError::ConfigInvalid {
                section: "backtest".into(),
                key: "rebalance_period".into(),
                reason: "--period must be at least 1 trading day".into(),
            });
        }
        bt_config.rebalance_period = period;
    }
    let kind = match strategy_override.map(Ok).unwrap_or_else(|| parse_strategy(&adapter)) {
        Ok(k) => k,
        Err(e) => return fail(e),
    };

    let output = output_path
        .cloned()
        .or_else(|| adapter.get_string("report", "output").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("equity.csv"));

    let data_port = CsvAdapter::new(data_dir(&adapter, config_path));
    run_backtest_pipeline(
        &data_port,
        &CsvReportAdapter,
        &adapter,
        kind,
        &bt_config,
        &output.display().to_string(),
    )
}

/// `[data] dir`, resolved against the config file's directory.
pub fn data_dir(adapter: &dyn ConfigPort, config_path: &Path) -> PathBuf {
    let dir = PathBuf::from(adapter.get_string("data", "dir").unwrap_or_else(|| ".".into()));
    if dir.is_absolute() {
        return dir;
    }
    match config_path.parent() {
        Some(parent) => parent.join(dir),
        None => dir,
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, RebalancerError> {
    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = match adapter.get_string("backtest", "end_date") {
        Some(s) => Some(parse_date(Some(&s), "end_date")?),
        None => None,
    };
    let period = adapter.get_int("backtest", "rebalance_period", DEFAULT_REBALANCE_PERIOD as i64);
    let rebalance_period = usize::try_from(period).map_err(|_| RebalancerError::ConfigInvalid {
        section: "backtest".into(),
        key: "rebalance_period".into(),
        reason: format!("{period} is not a valid number of trading days"),
    })?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_investment: adapter.get_double("backtest", "initial_investment", 10_000.0),
        rebalance_period,
    })
}

/// `[weights]` parsed and checked against the panel's columns.
pub fn load_weights(
    adapter: &dyn ConfigPort,
    panel: &PricePanel,
) -> Result<WeightMapping, RebalancerError> {
    let mut weights = WeightMapping::new();
    for (asset, value) in adapter.section_entries("weights") {
        let weight = value
            .parse::<f64>()
            .map_err(|_| RebalancerError::ConfigInvalid {
                section: "weights".into(),
                key: asset.clone(),
                reason: format!("weight '{value}' is not a number"),
            })?;
        weights.insert(asset, weight);
    }
    Ok(weights.validate(panel)?)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    adapter: &dyn ConfigPort,
    kind: StrategyKind,
    bt_config: &BacktestConfig,
    output_path: &str,
) -> ExitCode {
    // Stage 3: Load price data
    let Some(prices) = adapter.get_string("data", "prices") else {
        return fail(RebalancerError::ConfigMissing {
            section: "data".into(),
            key: "prices".into(),
        });
    };
    let panel = match data_port.fetch_panel(&prices) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    eprintln!(
        "Loaded {} sessions x {} assets ({} to {})",
        panel.len(),
        panel.assets().len(),
        panel.first_date(),
        panel.last_date()
    );

    let risk_free = match adapter.get_string("data", "risk_free") {
        Some(source) => match data_port.fetch_series(&source) {
            Ok(s) => Some(s),
            Err(e) => return fail(e),
        },
        None => None,
    };
    let benchmark = match adapter.get_string("data", "benchmark") {
        Some(source) => match data_port.fetch_series(&source) {
            Ok(s) => Some(s),
            Err(e) => return fail(e),
        },
        None => None,
    };

    // Stage 4: Build strategy
    let fixed = if kind == StrategyKind::Fixed {
        match load_weights(adapter, &panel) {
            Ok(w) => Some(w),
            Err(e) => return fail(e),
        }
    } else {
        None
    };
    let Some(strategy) = kind.build(fixed) else {
        return fail(RebalancerError::ConfigMissing {
            section: "weights".into(),
            key: "<asset>".into(),
        });
    };

    // Stage 5: Run the rebalancing loop
    eprintln!(
        "Running {} from {} every {} sessions, investing {:.2}",
        strategy.name(),
        bt_config.start_date,
        bt_config.rebalance_period,
        bt_config.initial_investment
    );
    let result = match engine::run_rebalancing_with(&panel, strategy.as_ref(), bt_config, |w| {
        eprintln!(
            "  window {}: {} -> {}  {:.2} -> {:.2}",
            w.iteration, w.start_date, w.end_date, w.starting_capital, w.ending_value
        );
        ControlFlow::Continue(())
    }) {
        Ok(r) => r,
        Err(e) => return fail(e.into()),
    };

    // Stage 6: Compute metrics
    let returns = ReturnTable::from_curve(&result.equity_curve);
    let summary =
        match PerformanceSummary::compute(&result.equity_curve, &returns, risk_free.as_ref()) {
            Ok(s) => s,
            Err(e) => return fail(e),
        };
    let benchmark_returns = match (
        &benchmark,
        result.equity_curve.first_date(),
        result.equity_curve.last_date(),
    ) {
        (Some(series), Some(start), Some(end)) => {
            Some(metrics::benchmark_returns(series, start, end))
        }
        _ => None,
    };

    // Stage 7: Print console summary
    print_summary(&summary, benchmark_returns.as_ref(), result.diagnostics().count());

    // Stage 8: Write report
    let report = RunReport {
        strategy: strategy.name(),
        result: &result,
        returns: &returns,
        benchmark: benchmark_returns.as_ref(),
        summary: &summary,
    };
    match report_port.write(&report, output_path) {
        Ok(()) => {
            eprintln!("\nReport written to: {output_path}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn print_summary(
    summary: &PerformanceSummary,
    benchmark: Option<&ReturnTable>,
    diagnostics: usize,
) {
    eprintln!("\n=== Results ===");
    eprintln!("Final Value:      {:.2}", summary.final_value);
    eprintln!("Total Return:     {:.2}%", summary.total_return * 100.0);
    match summary.cagr {
        Some(cagr) => eprintln!("CAGR:             {:.2}%", cagr * 100.0),
        None => eprintln!("CAGR:             n/a"),
    }
    if let Some(dd) = &summary.max_drawdown {
        eprintln!(
            "Max Drawdown:     {:.2}% ({} {:.2} -> {} {:.2})",
            dd.drawdown * 100.0,
            dd.peak_date,
            dd.peak_value,
            dd.trough_date,
            dd.trough_value
        );
    }
    if let Some(bench) = benchmark.and_then(ReturnTable::final_cum_return) {
        eprintln!("Benchmark Return: {:.2}%", bench * 100.0);
    }
    if !summary.sharpe.is_empty() {
        eprintln!("\n=== Sharpe by Period ===");
        for period in &summary.sharpe {
            eprintln!("  {} to {}:  {:.2}", period.start, period.end, period.ratio);
        }
    }
    if diagnostics > 0 {
        eprintln!("\n{diagnostics} diagnostics reported (see log)");
    }
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(e);
    }
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let kind = match parse_strategy(&adapter) {
        Ok(k) => k,
        Err(e) => return fail(e),
    };
    eprintln!("Config validated successfully");

    let data_port = CsvAdapter::new(data_dir(&adapter, config_path));
    let Some(prices) = adapter.get_string("data", "prices") else {
        return fail(RebalancerError::ConfigMissing {
            section: "data".into(),
            key: "prices".into(),
        });
    };
    let panel = match data_port.fetch_panel(&prices) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    if kind == StrategyKind::Fixed {
        match load_weights(&adapter, &panel) {
            Ok(w) => {
                eprintln!("\nFixed weights:");
                for (asset, weight) in w.iter() {
                    eprintln!("  {asset}: {weight:.4}");
                }
            }
            Err(e) => return fail(e),
        }
    }

    let schedule = match engine::window_schedule(&panel, &bt_config) {
        Ok(s) => s,
        Err(e) => return fail(e.into()),
    };
    eprintln!("\nStrategy: {kind}");
    eprintln!("Windows ({}):", schedule.len());
    for (i, (start, end)) in schedule.iter().enumerate() {
        eprintln!("  {i}: {start} -> {end}");
    }
    ExitCode::SUCCESS
}

pub fn run_info(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let Some(prices) = adapter.get_string("data", "prices") else {
        return fail(RebalancerError::ConfigMissing {
            section: "data".into(),
            key: "prices".into(),
        });
    };
    let data_port = CsvAdapter::new(data_dir(&adapter, config_path));
    let panel = match data_port.fetch_panel(&prices) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    println!("{:<12} {:<12} {:<12} {:>6}", "Asset", "First", "Last", "Rows");
    println!("{}", "-".repeat(45));
    for (j, asset) in panel.assets().iter().enumerate() {
        let listed: Vec<usize> = (0..panel.len())
            .filter(|&i| panel.row(i).is_some_and(|r| !r[j].is_nan()))
            .collect();
        match (listed.first(), listed.last()) {
            (Some(&first), Some(&last)) => println!(
                "{:<12} {:<12} {:<12} {:>6}",
                asset,
                panel.dates()[first],
                panel.dates()[last],
                listed.len()
            ),
            _ => println!("{:<12} {:<12} {:<12} {:>6}", asset, "-", "-", 0),
        }
    }
    println!(
        "\n{} sessions from {} to {}",
        panel.len(),
        panel.first_date(),
        panel.last_date()
    );
    ExitCode::SUCCESS
}
