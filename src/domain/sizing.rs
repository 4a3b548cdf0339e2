//! Position sizing: weights and capital to share counts at the window's
//! opening prices.
//!
//! shares[a] = weight[a] * capital / price[a]
//! Fills are assumed exact and fractional shares are allowed.

use crate::domain::diagnostic::Diagnostic;
use crate::domain::price_panel::PriceRow;
use crate::domain::weights::WeightMapping;

/// Share count per asset, fixed for the life of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareCounts {
    pub assets: Vec<String>,
    pub shares: Vec<f64>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ShareCounts {
    pub fn get(&self, asset: &str) -> f64 {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|j| self.shares[j])
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.assets
            .iter()
            .map(String::as_str)
            .zip(self.shares.iter().copied())
    }

    /// Mark-to-market value at `row`; unpriced assets count as zero.
    pub fn market_value(&self, row: &PriceRow<'_>) -> f64 {
        self.iter()
            .filter(|(_, n)| *n != 0.0)
            .filter_map(|(asset, n)| row.price(asset).map(|p| n * p))
            .filter(|v| v.is_finite())
            .sum()
    }
}

/// One share count per column of `prices`; unknown weight keys are
/// reported, unpriced assets get zero shares.
pub fn size(weights: &WeightMapping, capital: f64, prices: &PriceRow<'_>) -> ShareCounts {
    let mut diagnostics = Vec::new();

    for asset in weights.assets() {
        if !prices.assets.iter().any(|a| a == asset) {
            diagnostics.push(Diagnostic::ShapeMismatch {
                asset: asset.to_string(),
            });
        }
    }

    let shares = prices
        .assets
        .iter()
        .zip(prices.prices)
        .map(|(asset, &price)| {
            let weight = weights.get(asset);
            if weight == 0.0 {
                return 0.0;
            }
            if !(price.is_finite() && price > 0.0) {
                diagnostics.push(Diagnostic::MissingPrice {
                    asset: asset.clone(),
                    date: prices.date,
                });
                return 0.0;
            }
            let n = weight * capital / price;
            if n.is_finite() { n } else { 0.0 }
        })
        .collect();

    ShareCounts {
        assets: prices.assets.to_vec(),
        shares,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row<'a>(assets: &'a [String], prices: &'a [f64]) -> PriceRow<'a> {
        PriceRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            assets,
            prices,
        }
    }

    fn assets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn equal_split_at_flat_prices() {
        let names = assets(&["A", "B"]);
        let prices = [100.0, 100.0];
        let w: WeightMapping = [("A", 0.5), ("B", 0.5)].into_iter().collect();
        let shares = size(&w, 1000.0, &row(&names, &prices));
        assert_eq!(shares.get("A"), 5.0);
        assert_eq!(shares.get("B"), 5.0);
        assert!(shares.diagnostics.is_empty());
    }

    #[test]
    fn shares_times_price_equals_allocated_capital() {
        let names = assets(&["A", "B", "C"]);
        let prices = [37.5, 212.25, 3.1];
        let w: WeightMapping = [("A", 0.2), ("B", 0.7), ("C", 0.1)].into_iter().collect();
        let shares = size(&w, 12_345.0, &row(&names, &prices));
        for (j, name) in names.iter().enumerate() {
            let allocated = w.get(name) * 12_345.0;
            assert!((shares.get(name) * prices[j] - allocated).abs() < 1e-9);
        }
    }

    #[test]
    fn missing_price_gives_zero_shares() {
        let names = assets(&["A", "B"]);
        let prices = [f64::NAN, 50.0];
        let w: WeightMapping = [("A", 0.5), ("B", 0.5)].into_iter().collect();
        let shares = size(&w, 1000.0, &row(&names, &prices));
        assert_eq!(shares.get("A"), 0.0);
        assert_eq!(shares.get("B"), 10.0);
        assert!(matches!(
            shares.diagnostics.as_slice(),
            [Diagnostic::MissingPrice { asset, .. }] if asset == "A"
        ));
    }

    #[test]
    fn unknown_asset_is_reported_not_fatal() {
        let names = assets(&["A"]);
        let prices = [10.0];
        let w: WeightMapping = [("A", 0.5), ("ZZZ", 0.5)].into_iter().collect();
        let shares = size(&w, 100.0, &row(&names, &prices));
        assert_eq!(shares.assets, names);
        assert_eq!(shares.get("A"), 5.0);
        assert_eq!(
            shares.diagnostics,
            vec![Diagnostic::ShapeMismatch {
                asset: "ZZZ".into()
            }]
        );
    }

    #[test]
    fn empty_weights_hold_nothing() {
        let names = assets(&["A", "B"]);
        let prices = [10.0, 20.0];
        let shares = size(&WeightMapping::new(), 100.0, &row(&names, &prices));
        assert_eq!(shares.shares, vec![0.0, 0.0]);
    }

    #[test]
    fn market_value_skips_unpriced() {
        let names = assets(&["A", "B"]);
        let shares = ShareCounts {
            assets: names.clone(),
            shares: vec![2.0, 3.0],
            diagnostics: vec![],
        };
        let prices = [10.0, f64::NAN];
        assert_eq!(shares.market_value(&row(&names, &prices)), 20.0);
    }
}
