//! Weight allocation strategies.
//!
//! A strategy looks only at the trailing lookback strictly before a
//! window and returns the weights to hold for that window. The
//! orchestrator calls every variant through [`AllocationStrategy`].

pub mod fixed;
pub mod momentum;
pub mod performance_weighted;
pub mod quantile_weighted;
pub mod vol_adjusted;

use crate::domain::diagnostic::Diagnostic;
use crate::domain::price_panel::PricePanel;
use crate::domain::weights::WeightMapping;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

pub use fixed::FixedWeights;
pub use performance_weighted::MomentumPerformanceWeighted;
pub use quantile_weighted::MomentumQuantileWeighted;
pub use vol_adjusted::MomentumVolWeighted;

/// Weights for one window plus anything worth reporting about them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    pub weights: WeightMapping,
    pub diagnostics: Vec<Diagnostic>,
}

impl Allocation {
    pub fn new(weights: WeightMapping) -> Self {
        Self {
            weights,
            diagnostics: Vec::new(),
        }
    }

    /// Empty allocation explained by `diagnostic`.
    pub fn empty(diagnostic: Diagnostic) -> Self {
        Self {
            weights: WeightMapping::new(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    /// The `(available, required)` pair when history was too short.
    pub fn insufficient_history(&self) -> Option<(usize, usize)> {
        self.diagnostics.iter().find_map(|d| match d {
            Diagnostic::InsufficientHistory {
                available,
                required,
                ..
            } => Some((*available, *required)),
            _ => None,
        })
    }

    /// Date of the window when no asset could be scored.
    pub fn unscored(&self) -> Option<NaiveDate> {
        self.diagnostics.iter().find_map(|d| match d {
            Diagnostic::NoScoredAssets { date } => Some(*date),
            _ => None,
        })
    }
}

pub trait AllocationStrategy {
    fn name(&self) -> &str;

    fn allocate(
        &self,
        panel: &PricePanel,
        window_start: NaiveDate,
        window_length: usize,
    ) -> Allocation;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    MomentumPerformanceWeighted,
    MomentumQuantile,
    #[default]
    MomentumVolWeighted,
    Fixed,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::MomentumPerformanceWeighted => "momentum_performance_weighted",
            StrategyKind::MomentumQuantile => "momentum_quantile",
            StrategyKind::MomentumVolWeighted => "momentum_vol_weighted",
            StrategyKind::Fixed => "fixed",
        }
    }

    /// Boxed strategy; `fixed` needs the validated weights.
    pub fn build(&self, fixed: Option<WeightMapping>) -> Option<Box<dyn AllocationStrategy>> {
        match self {
            StrategyKind::MomentumPerformanceWeighted => {
                Some(Box::new(MomentumPerformanceWeighted))
            }
            StrategyKind::MomentumQuantile => Some(Box::new(MomentumQuantileWeighted)),
            StrategyKind::MomentumVolWeighted => Some(Box::new(MomentumVolWeighted)),
            StrategyKind::Fixed => fixed
                .map(|w| Box::new(FixedWeights::new(w)) as Box<dyn AllocationStrategy>),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "momentum_performance_weighted" | "performance" => {
                Ok(StrategyKind::MomentumPerformanceWeighted)
            }
            "momentum_quantile" | "momentum_performance_quantile" | "quantile" => {
                Ok(StrategyKind::MomentumQuantile)
            }
            "momentum_vol_weighted" | "vol" => Ok(StrategyKind::MomentumVolWeighted),
            "fixed" => Ok(StrategyKind::Fixed),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}
