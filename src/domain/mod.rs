//! Core domain types and logic.

pub mod backtest;
pub mod calendar;
pub mod config_validation;
pub mod diagnostic;
pub mod error;
pub mod metrics;
pub mod price_panel;
pub mod sizing;
pub mod strategy;
pub mod valuation;
pub mod weights;
