//! Data access port trait.

use crate::domain::error::RebalancerError;
use crate::domain::price_panel::{PricePanel, PriceSeries};

pub trait DataPort {
    /// Wide price table: one date column followed by one column per asset.
    fn fetch_panel(&self, source: &str) -> Result<PricePanel, RebalancerError>;

    /// Single close series, e.g. a benchmark index or a risk-free rate.
    fn fetch_series(&self, source: &str) -> Result<PriceSeries, RebalancerError>;
}
