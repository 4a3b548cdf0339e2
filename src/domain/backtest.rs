//! Rebalancing loop.
//!
//! Walks the panel in windows of `rebalance_period` trading days. Each
//! window asks the strategy for weights, sizes positions with the capital
//! carried over from the previous window, values them until the window
//! closes, and appends the result to one continuous equity curve.
//!
//! The regular loop runs while a full window plus more than another full
//! period remain (`cursor + 2n < final`); whatever is left becomes a
//! single tail window that ends exactly on the last available session.

use crate::domain::diagnostic::Diagnostic;
use crate::domain::error::{CalendarError, RebalanceError};
use crate::domain::price_panel::PricePanel;
use crate::domain::sizing::{self, ShareCounts};
use crate::domain::strategy::AllocationStrategy;
use crate::domain::valuation::{self, Valuation, ValueTable};
use crate::domain::weights::WeightMapping;
use chrono::NaiveDate;
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

pub const DEFAULT_REBALANCE_PERIOD: usize = 252;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    /// Last session considered; `None` runs to the end of the panel.
    pub end_date: Option<NaiveDate>,
    pub initial_investment: f64,
    pub rebalance_period: usize,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, initial_investment: f64) -> Self {
        Self {
            start_date,
            end_date: None,
            initial_investment,
            rebalance_period: DEFAULT_REBALANCE_PERIOD,
        }
    }
}

/// What happened in one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    pub iteration: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub starting_capital: f64,
    pub ending_value: f64,
    pub weights: WeightMapping,
    pub diagnostics: Vec<Diagnostic>,
    pub is_tail: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub equity_curve: ValueTable,
    pub windows: Vec<WindowReport>,
}

impl BacktestResult {
    pub fn final_value(&self) -> Option<f64> {
        self.equity_curve.last_total()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.windows.iter().flat_map(|w| w.diagnostics.iter())
    }
}

pub fn run_rebalancing(
    panel: &PricePanel,
    strategy: &dyn AllocationStrategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, RebalanceError> {
    run_rebalancing_with(panel, strategy, config, |_| ControlFlow::Continue(()))
}

/// Like [`run_rebalancing`], calling `observer` after every regular window.
/// Returning `ControlFlow::Break` stops the run with
/// [`RebalanceError::Cancelled`].
pub fn run_rebalancing_with<F>(
    panel: &PricePanel,
    strategy: &dyn AllocationStrategy,
    config: &BacktestConfig,
    mut observer: F,
) -> Result<BacktestResult, RebalanceError>
where
    F: FnMut(&WindowReport) -> ControlFlow<()>,
{
    let n = check_inputs(config)?;
    let mut capital = config.initial_investment;
    let mut start = config.start_date;
    let mut iteration = 0usize;

    let abort = |iteration: usize, date: NaiveDate, capital: f64| {
        move |source: CalendarError| RebalanceError::Calendar {
            iteration,
            date,
            capital,
            source,
        }
    };

    let mut cursor = panel.locate(start).map_err(abort(0, start, capital))?;
    let final_offset = final_offset(panel, config, cursor).map_err(abort(0, start, capital))?;

    info!(
        strategy = strategy.name(),
        start = %start,
        end = %panel.dates()[final_offset],
        period = n,
        capital,
        "starting rebalancing run"
    );

    let mut curve = ValueTable::default();
    let mut windows = Vec::new();

    while has_full_window(cursor, n, final_offset) {
        let end = panel
            .offset_date(start, n as isize)
            .map_err(abort(iteration, start, capital))?;

        let (report, table) =
            run_window(panel, strategy, iteration, start, end, n, capital, false)?;
        curve.append(table);

        // next window opens on this one's closing session
        capital = report.ending_value;
        start = end;
        cursor = panel.locate(start).map_err(abort(iteration, start, capital))?;

        let flow = observer(&report);
        windows.push(report);
        if flow.is_break() {
            info!(iteration, "rebalancing cancelled");
            return Err(RebalanceError::Cancelled { iteration });
        }
        iteration += 1;
    }

    let day_left = final_offset - cursor;
    let end = panel
        .offset_date(start, day_left as isize)
        .map_err(abort(iteration, start, capital))?;
    let (report, table) = run_window(panel, strategy, iteration, start, end, n, capital, true)?;
    curve.append(table);
    windows.push(report);

    info!(
        windows = windows.len(),
        final_value = curve.last_total().unwrap_or(0.0),
        "rebalancing run complete"
    );

    Ok(BacktestResult {
        equity_curve: curve,
        windows,
    })
}

/// Window bounds `run_rebalancing` would use, without running a strategy.
pub fn window_schedule(
    panel: &PricePanel,
    config: &BacktestConfig,
) -> Result<Vec<(NaiveDate, NaiveDate)>, CalendarError> {
    let n = config.rebalance_period.max(1);
    let mut start = config.start_date;
    let mut cursor = panel.locate(start)?;
    let final_offset = final_offset(panel, config, cursor)?;
    let mut schedule = Vec::new();

    while has_full_window(cursor, n, final_offset) {
        let end = panel.offset_date(start, n as isize)?;
        schedule.push((start, end));
        start = end;
        cursor = panel.locate(start)?;
    }
    let end = panel.offset_date(start, (final_offset - cursor) as isize)?;
    schedule.push((start, end));
    Ok(schedule)
}

/// Buy at `config.start_date` with `weights` and hold to the end, no
/// rebalancing.
pub fn run_single_period(
    panel: &PricePanel,
    weights: &WeightMapping,
    config: &BacktestConfig,
) -> Result<(ShareCounts, Valuation), RebalanceError> {
    check_inputs(config)?;
    let capital = config.initial_investment;
    let abort = |source| RebalanceError::Calendar {
        iteration: 0,
        date: config.start_date,
        capital,
        source,
    };

    let start = panel.locate(config.start_date).map_err(abort)?;
    let end = final_offset(panel, config, start).map_err(abort)?;
    let (row, slice) = match (panel.price_row(start), panel.slice(start, end)) {
        (Some(row), Some(slice)) => (row, slice),
        _ => {
            return Err(abort(CalendarError::OutOfRange {
                date: config.start_date,
                offset: end as isize,
                len: panel.len(),
            }));
        }
    };

    let shares = sizing::size(weights, capital, &row);
    let valuation = valuation::value(&shares, &slice);
    for diag in shares.diagnostics.iter().chain(&valuation.diagnostics) {
        warn!(date = %config.start_date, "{diag}");
    }
    Ok((shares, valuation))
}

fn check_inputs(config: &BacktestConfig) -> Result<usize, RebalanceError> {
    if config.rebalance_period == 0 {
        return Err(RebalanceError::ZeroPeriod);
    }
    if !(config.initial_investment.is_finite() && config.initial_investment > 0.0) {
        return Err(RebalanceError::NonPositiveCapital(config.initial_investment));
    }
    Ok(config.rebalance_period)
}

/// Whether a regular window fits with more than another period left after it.
fn has_full_window(cursor: usize, period: usize, final_offset: usize) -> bool {
    period
        .checked_mul(2)
        .and_then(|span| cursor.checked_add(span))
        .is_some_and(|reach| reach < final_offset)
}

/// Last row inside the backtest period.
fn final_offset(
    panel: &PricePanel,
    config: &BacktestConfig,
    cursor: usize,
) -> Result<usize, CalendarError> {
    let last = match config.end_date {
        Some(end) => panel.dates().partition_point(|d| *d <= end),
        None => panel.len(),
    };
    if last == 0 || last - 1 < cursor {
        return Err(CalendarError::OutOfRange {
            date: config.start_date,
            offset: last as isize - 1 - cursor as isize,
            len: panel.len(),
        });
    }
    Ok(last - 1)
}

#[allow(clippy::too_many_arguments)]
fn run_window(
    panel: &PricePanel,
    strategy: &dyn AllocationStrategy,
    iteration: usize,
    start: NaiveDate,
    end: NaiveDate,
    period: usize,
    capital: f64,
    is_tail: bool,
) -> Result<(WindowReport, ValueTable), RebalanceError> {
    let calendar = |source| RebalanceError::Calendar {
        iteration,
        date: start,
        capital,
        source,
    };

    let allocation = strategy.allocate(panel, start, period);
    if let Some((available, required)) = allocation.insufficient_history() {
        return Err(RebalanceError::InsufficientHistory {
            iteration,
            date: start,
            capital,
            available,
            required,
        });
    }
    if allocation.unscored().is_some() {
        return Err(RebalanceError::NoScoredAssets {
            iteration,
            date: start,
            capital,
        });
    }

    let start_offset = panel.locate(start).map_err(calendar)?;
    let end_offset = panel.locate(end).map_err(calendar)?;
    let out_of_range = || {
        calendar(CalendarError::OutOfRange {
            date: start,
            offset: end_offset as isize,
            len: panel.len(),
        })
    };
    let row = panel.price_row(start_offset).ok_or_else(out_of_range)?;
    let slice = panel
        .slice(start_offset, end_offset)
        .ok_or_else(out_of_range)?;

    let shares = sizing::size(&allocation.weights, capital, &row);
    let valuation = valuation::value(&shares, &slice);
    let ending_value = valuation.table.last_total().unwrap_or(0.0);

    let mut diagnostics = allocation.diagnostics;
    diagnostics.extend(shares.diagnostics);
    diagnostics.extend(valuation.diagnostics);
    for diag in &diagnostics {
        warn!(iteration, window_start = %start, "{diag}");
    }

    debug!(
        iteration,
        start = %start,
        end = %end,
        capital,
        ending_value,
        tail = is_tail,
        "window valued"
    );

    let report = WindowReport {
        iteration,
        start_date: start,
        end_date: end,
        starting_capital: capital,
        ending_value,
        weights: allocation.weights,
        diagnostics,
        is_tail,
    };
    Ok((report, valuation.table))
}
