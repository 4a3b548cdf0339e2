//! Volatility-adjusted momentum: trailing return divided by the volatility
//! of daily returns, positive scores only, weights proportional to score.

use super::momentum::{
    equal_weights, finite_scores, lookback, momentum_scores, volatilities, zero_weights,
};
use super::{Allocation, AllocationStrategy};
use crate::domain::diagnostic::Diagnostic;
use crate::domain::price_panel::PricePanel;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumVolWeighted;

impl AllocationStrategy for MomentumVolWeighted {
    fn name(&self) -> &str {
        "momentum_vol_weighted"
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

        let momentum = momentum_scores(&lb);
        let listed: Vec<usize> = finite_scores(&momentum).iter().map(|(j, _)| *j).collect();
        if listed.is_empty() {
            return Allocation::empty(Diagnostic::NoScoredAssets { date: window_start });
        }

        let vols = volatilities(&lb);
        let adjusted: Vec<f64> = momentum.iter().zip(&vols).map(|(m, v)| m / v).collect();

        let positive: Vec<(usize, f64)> = finite_scores(&adjusted)
            .into_iter()
            .filter(|(_, s)| *s > 0.0)
            .collect();

        if positive.is_empty() {
            // hold everything that has a trailing return rather than nothing
            return Allocation::new(equal_weights(panel, &listed))
                .with_diagnostic(Diagnostic::NoEligibleAssets { date: window_start });
        }

        let total: f64 = positive.iter().map(|(_, s)| s).sum();
        let mut weights = zero_weights(panel);
        for (j, score) in positive {
            weights.insert(panel.assets()[j].as_str(), score / total);
        }
        Allocation::new(weights)
    }
}
