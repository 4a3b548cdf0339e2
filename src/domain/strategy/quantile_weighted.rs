//! Momentum quantile bands.
//!
//! Trailing returns are cut at the 40/60/80% quantiles. The bottom 40%
//! shares 10% of capital, then 20%, 30% and 40% for the upper bands, split
//! equally inside each band. Bands left empty by ties give up their share
//! and the rest is renormalized.

use super::momentum::{
    finite_scores, lookback, momentum_scores, quantile, sorted_values, zero_weights,
};
use super::{Allocation, AllocationStrategy};
use crate::domain::diagnostic::Diagnostic;
use crate::domain::price_panel::PricePanel;
use chrono::NaiveDate;

const BAND_TARGETS: [f64; 4] = [0.1, 0.2, 0.3, 0.4];

#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumQuantileWeighted;

impl AllocationStrategy for MomentumQuantileWeighted {
    fn name(&self) -> &str {
        "momentum_quantile"
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

        let sorted = sorted_values(&scored);
        let cuts = [
            quantile(&sorted, 0.4),
            quantile(&sorted, 0.6),
            quantile(&sorted, 0.8),
        ];
        let band_of = |score: f64| cuts.iter().position(|&c| score <= c).unwrap_or(3);

        let mut counts = [0usize; 4];
        for (_, score) in &scored {
            counts[band_of(*score)] += 1;
        }
        let live: f64 = BAND_TARGETS
            .iter()
            .zip(&counts)
            .filter(|(_, n)| **n > 0)
            .map(|(t, _)| t)
            .sum();

        let mut weights = zero_weights(panel);
        for (j, score) in scored {
            let band = band_of(score);
            let weight = BAND_TARGETS[band] / counts[band] as f64 / live;
            weights.insert(panel.assets()[j].as_str(), weight);
        }
        Allocation::new(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(i: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i)
    }

    fn panel(ends: &[f64]) -> PricePanel {
        let assets: Vec<String> = (0..ends.len()).map(|i| format!("S{i}")).collect();
        let starts = vec![100.0; ends.len()];
        let rows = vec![starts, ends.to_vec(), ends.to_vec()];
        PricePanel::new(vec![day(0), day(1), day(2)], assets, rows).unwrap()
    }

    #[test]
    fn ten_assets_follow_band_targets() {
        let ends: Vec<f64> = (1..=10).map(|i| 100.0 + i as f64).collect();
        let a = MomentumQuantileWeighted.allocate(&panel(&ends), day(2), 2);

        assert!((a.weights.total() - 1.0).abs() < 1e-9);
        // bottom four share 0.1
        assert!((a.weights.get("S0") - 0.025).abs() < 1e-9);
        assert!((a.weights.get("S3") - 0.025).abs() < 1e-9);
        // top two share 0.4
        assert!((a.weights.get("S9") - 0.2).abs() < 1e-9);
    }

    #[test]
    fn weights_increase_with_band() {
        let ends: Vec<f64> = (1..=5).map(|i| 100.0 + i as f64).collect();
        let a = MomentumQuantileWeighted.allocate(&panel(&ends), day(2), 2);
        let w: Vec<f64> = (0..5).map(|i| a.weights.get(&format!("S{i}"))).collect();
        for pair in w.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert!((a.weights.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ties_renormalize() {
        let a = MomentumQuantileWeighted.allocate(&panel(&[110.0; 3]), day(2), 2);
        for i in 0..3 {
            assert!((a.weights.get(&format!("S{i}")) - 1.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn unlisted_lookback_is_unscored() {
        let p = PricePanel::new(
            vec![day(0), day(1), day(2)],
            vec!["S0".into(), "S1".into()],
            vec![
                vec![f64::NAN, f64::NAN],
                vec![100.0, f64::NAN],
                vec![101.0, 50.0],
            ],
        )
        .unwrap();
        let a = MomentumQuantileWeighted.allocate(&p, day(2), 2);
        assert!(a.weights.is_empty());
        assert_eq!(a.unscored(), Some(day(2)));
    }

    #[test]
    fn insufficient_history_is_empty() {
        let a = MomentumQuantileWeighted.allocate(&panel(&[110.0]), day(0), 2);
        assert!(a.weights.is_empty());
        assert!(a.insufficient_history().is_some());
    }
}
