//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::RebalancerError;
use crate::domain::metrics::{PerformanceSummary, ReturnTable};

/// Everything a finished run hands to a report writer.
#[derive(Debug, Clone, Copy)]
pub struct RunReport<'a> {
    pub strategy: &'a str,
    pub result: &'a BacktestResult,
    pub returns: &'a ReturnTable,
    pub benchmark: Option<&'a ReturnTable>,
    pub summary: &'a PerformanceSummary,
}

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, report: &RunReport<'_>, output_path: &str) -> Result<(), RebalancerError>;
}
