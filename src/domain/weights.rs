//! Asset → weight mapping produced per window by an allocation strategy.

use crate::domain::error::WeightError;
use crate::domain::price_panel::PricePanel;
use std::collections::BTreeMap;

/// Allowed distance of a weight sum from 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightMapping {
    weights: BTreeMap<String, f64>,
}

impl WeightMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: impl Into<String>, weight: f64) {
        self.weights.insert(asset.into(), weight);
    }

    /// Weight of `asset`, zero when absent.
    pub fn get(&self, asset: &str) -> f64 {
        self.weights.get(asset).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.weights.contains_key(asset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(a, w)| (a.as_str(), *w))
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() <= WEIGHT_TOLERANCE
    }

    /// Checks a caller-supplied mapping and rekeys it with the panel's
    /// column spelling.
    pub fn validate(&self, panel: &PricePanel) -> Result<WeightMapping, WeightError> {
        let mut resolved = WeightMapping::new();
        for (asset, weight) in self.iter() {
            let column = panel
                .resolve_asset(asset)
                .ok_or_else(|| WeightError::UnknownAsset(asset.to_string()))?;
            if !weight.is_finite() {
                return Err(WeightError::NonFinite {
                    asset: asset.to_string(),
                });
            }
            if weight < 0.0 {
                return Err(WeightError::Negative {
                    asset: asset.to_string(),
                    weight,
                });
            }
            resolved.insert(column, weight);
        }
        if !resolved.is_normalized() {
            return Err(WeightError::BadSum {
                total: resolved.total(),
            });
        }
        Ok(resolved)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for WeightMapping {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut mapping = WeightMapping::new();
        for (asset, weight) in iter {
            mapping.insert(asset, weight);
        }
        mapping
    }
}
