//! Configuration validation.
//!
//! Validates every config field before any data is loaded.

use crate::domain::error::RebalancerError;
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    validate_prices_source(config)?;
    validate_dates(config)?;
    validate_initial_investment(config)?;
    validate_rebalance_period(config)?;
    let kind = parse_strategy(config)?;
    if kind == StrategyKind::Fixed {
        validate_weights_section(config)?;
    }
    Ok(())
}

fn validate_prices_source(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    match config.get_string("data", "prices") {
        Some(_) => Ok(()),
        None => Err(RebalancerError::ConfigMissing {
            section: "data".to_string(),
            key: "prices".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    if let Some(end_str) = config.get_string("backtest", "end_date") {
        let end_date = parse_date(Some(&end_str), "end_date")?;
        if start_date >= end_date {
            return Err(RebalancerError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "start_date".to_string(),
                reason: "start_date must be before end_date".to_string(),
            });
        }
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, RebalancerError> {
    match value {
        None => Err(RebalancerError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| RebalancerError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            })
        }
    }
}

fn validate_initial_investment(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    let value = config.get_double("backtest", "initial_investment", 10_000.0);
    if !(value.is_finite() && value > 0.0) {
        return Err(RebalancerError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_investment".to_string(),
            reason: "initial_investment must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_rebalance_period(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    let value = config.get_int("backtest", "rebalance_period", 252);
    if value < 1 {
        return Err(RebalancerError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "rebalance_period".to_string(),
            reason: "rebalance_period must be at least 1 trading day".to_string(),
        });
    }
    Ok(())
}

/// `[backtest] strategy`, defaulting to the volatility-adjusted variant.
pub fn parse_strategy(config: &dyn ConfigPort) -> Result<StrategyKind, RebalancerError> {
    match config.get_string("backtest", "strategy") {
        None => Ok(StrategyKind::default()),
        Some(name) => name.parse().map_err(|reason| RebalancerError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "strategy".to_string(),
            reason,
        }),
    }
}

fn validate_weights_section(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    let entries = config.section_entries("weights");
    if entries.is_empty() {
        return Err(RebalancerError::ConfigMissing {
            section: "weights".to_string(),
            key: "<asset>".to_string(),
        });
    }
    for (asset, value) in entries {
        if value.parse::<f64>().is_err() {
            return Err(RebalancerError::ConfigInvalid {
                section: "weights".to_string(),
                key: asset,
                reason: format!("weight '{}' is not a number", value),
            });
        }
    }
    Ok(())
}
