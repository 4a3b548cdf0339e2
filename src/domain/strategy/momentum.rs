//! Trailing-return scoring shared by the momentum strategies.
//!
//! Lookback for a window starting at row `s` with length `w` is rows
//! `s-w ..= s-1`, so the window's own first session is never read.
//! Momentum = last / first - 1 over the lookback.
//! Volatility = sample standard deviation of the daily returns inside it.

use crate::domain::diagnostic::Diagnostic;
use crate::domain::price_panel::{PanelSlice, PricePanel};
use crate::domain::weights::WeightMapping;
use chrono::NaiveDate;

/// Rows strictly before `window_start`, `window_length` of them.
pub fn lookback(
    panel: &PricePanel,
    window_start: NaiveDate,
    window_length: usize,
) -> Result<PanelSlice<'_>, Diagnostic> {
    let start = panel
        .locate(window_start)
        .map_err(|_| Diagnostic::NotATradingDay { date: window_start })?;

    if window_length == 0 || start < window_length {
        return Err(Diagnostic::InsufficientHistory {
            date: window_start,
            available: start,
            required: window_length,
        });
    }

    panel
        .slice(start - window_length, start - 1)
        .ok_or(Diagnostic::InsufficientHistory {
            date: window_start,
            available: start,
            required: window_length,
        })
}

/// Per-asset trailing return; NaN when either end has no price.
pub fn momentum_scores(lookback: &PanelSlice<'_>) -> Vec<f64> {
    let rows = lookback.rows();
    let first = &rows[0];
    let last = &rows[rows.len() - 1];
    first
        .iter()
        .zip(last)
        .map(|(&p0, &p1)| p1 / p0 - 1.0)
        .collect()
}

/// Per-asset volatility of daily returns; NaN when any return is missing
/// or fewer than two returns exist.
pub fn volatilities(lookback: &PanelSlice<'_>) -> Vec<f64> {
    let rows = lookback.rows();
    (0..lookback.assets().len())
        .map(|j| {
            let returns: Vec<f64> = rows.windows(2).map(|w| w[1][j] / w[0][j] - 1.0).collect();
            sample_stddev(&returns)
        })
        .collect()
}

pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 || values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Finite scores with their column index.
pub fn finite_scores(scores: &[f64]) -> Vec<(usize, f64)> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .map(|(i, &s)| (i, s))
        .collect()
}

pub fn sorted_values(scored: &[(usize, f64)]) -> Vec<f64> {
    let mut values: Vec<f64> = scored.iter().map(|(_, s)| *s).collect();
    values.sort_by(f64::total_cmp);
    values
}

/// Every panel column at zero weight.
pub fn zero_weights(panel: &PricePanel) -> WeightMapping {
    panel.assets().iter().map(|a| (a.as_str(), 0.0)).collect()
}

/// Equal split across `columns`, every other column at zero.
pub fn equal_weights(panel: &PricePanel, columns: &[usize]) -> WeightMapping {
    let mut weights = zero_weights(panel);
    if columns.is_empty() {
        return weights;
    }
    let share = 1.0 / columns.len() as f64;
    for &j in columns {
        weights.insert(panel.assets()[j].as_str(), share);
    }
    weights
}
