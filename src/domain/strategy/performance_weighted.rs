//! Momentum performance weighting.
//!
//! Drops the bottom quintile of trailing returns, shifts the survivors by
//! `|min survivor|` so scores are non-negative, and weights in proportion.
//! In a broad sell-off the shift leaves the weakest survivor at (or near)
//! zero weight; that skew is kept as is.

use super::momentum::{
    equal_weights, finite_scores, lookback, momentum_scores, quantile, sorted_values,
    zero_weights,
};
use super::{Allocation, AllocationStrategy};
use crate::domain::diagnostic::Diagnostic;
use crate::domain::price_panel::PricePanel;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumPerformanceWeighted;

impl AllocationStrategy for MomentumPerformanceWeighted {
    fn name(&self) -> &str {
        "momentum_performance_weighted"
    }

    fn allocate(
        &self,
        panel: &PricePanel,
        window_start: NaiveDate,
        window_length: usize,
    ) -> Allocation {
        let lb = match lookback(panel, window_start, window_length) {
            Ok(lb) => lb,
            Err(diag) => return Allocation::empty(diag),
        };

        let scored = finite_scores(&momentum_scores(&lb));
        if scored.is_empty() {
            return Allocation::empty(Diagnostic::NoScoredAssets { date: window_start });
        }

        let cutoff = quantile(&sorted_values(&scored), 0.2);
        let survivors: Vec<(usize, f64)> =
            scored.iter().copied().filter(|(_, s)| *s > cutoff).collect();

        let to_add = survivors
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::INFINITY, f64::min)
            .abs();
        let total: f64 = survivors.iter().map(|(_, s)| s + to_add).sum();

        if survivors.is_empty() || !(total.is_finite() && total > 0.0) {
            let columns: Vec<usize> = if survivors.is_empty() {
                scored.iter().map(|(j, _)| *j).collect()
            } else {
                survivors.iter().map(|(j, _)| *j).collect()
            };
            return Allocation::new(equal_weights(panel, &columns))
                .with_diagnostic(Diagnostic::DegenerateScores { date: window_start });
        }

        let mut weights = zero_weights(panel);
        for (j, score) in survivors {
            weights.insert(panel.assets()[j].as_str(), (score + to_add) / total);
        }
        Allocation::new(weights)
    }
}
