//! Caller-chosen weights held constant across every window.

use super::{Allocation, AllocationStrategy};
use crate::domain::diagnostic::Diagnostic;
use crate::domain::price_panel::PricePanel;
use crate::domain::weights::WeightMapping;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct FixedWeights {
    weights: WeightMapping,
}

impl FixedWeights {
    /// `weights` should already be validated against the panel.
    pub fn new(weights: WeightMapping) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightMapping {
        &self.weights
    }
}

impl AllocationStrategy for FixedWeights {
    fn name(&self) -> &str {
        "fixed"
    }

    fn allocate(
        &self,
        panel: &PricePanel,
        window_start: NaiveDate,
        _window_length: usize,
    ) -> Allocation {
        let allocation = Allocation::new(self.weights.clone());
        match panel.locate(window_start) {
            Ok(_) => allocation,
            Err(_) => allocation.with_diagnostic(Diagnostic::NotATradingDay { date: window_start }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> PricePanel {
        PricePanel::new(
            vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()],
            vec!["A".into(), "B".into()],
            vec![vec![100.0, 100.0]],
        )
        .unwrap()
    }

    #[test]
    fn returns_same_weights_without_history() {
        let w: WeightMapping = [("A", 0.5), ("B", 0.5)].into_iter().collect();
        let strategy = FixedWeights::new(w.clone());
        let a = strategy.allocate(&panel(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 252);
        assert_eq!(a.weights, w);
        assert!(a.diagnostics.is_empty());
    }

    #[test]
    fn flags_non_trading_day() {
        let w: WeightMapping = [("A", 1.0)].into_iter().collect();
        let strategy = FixedWeights::new(w);
        let date = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let a = strategy.allocate(&panel(), date, 5);
        assert_eq!(a.diagnostics, vec![Diagnostic::NotATradingDay { date }]);
    }
}
