//! Returns, CAGR, maximum drawdown and rolling Sharpe over an equity curve.

use super::error::RebalancerError;
use super::price_panel::PriceSeries;
use super::valuation::ValueTable;
use chrono::NaiveDate;

pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Period and cumulative returns of a value series. The first input row
/// has no prior value and is dropped, so `dates` starts one session later.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnTable {
    pub dates: Vec<NaiveDate>,
    pub total_return: Vec<f64>,
    pub cum_return: Vec<f64>,
}

impl ReturnTable {
    /// Percentage change of `values`; undefined changes count as 0.
    pub fn from_values(dates: &[NaiveDate], values: &[f64]) -> Self {
        let mut table = ReturnTable::default();
        let mut growth = 1.0;
        for (date, pair) in dates.iter().skip(1).zip(values.windows(2)) {
            let r = pair[1] / pair[0] - 1.0;
            let r = if r.is_finite() { r } else { 0.0 };
            growth *= 1.0 + r;
            table.dates.push(*date);
            table.total_return.push(r);
            table.cum_return.push(growth - 1.0);
        }
        table
    }

    pub fn from_curve(curve: &ValueTable) -> Self {
        Self::from_values(&curve.dates, &curve.total)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn final_cum_return(&self) -> Option<f64> {
        self.cum_return.last().copied()
    }
}

/// Returns of a benchmark close series between `start` and `end` inclusive.
pub fn benchmark_returns(series: &PriceSeries, start: NaiveDate, end: NaiveDate) -> ReturnTable {
    let (dates, values) = series.between(start, end);
    ReturnTable::from_values(dates, values)
}

/// `(1 + total_return)^(252 / n) - 1` where `n` counts the rows of
/// `values`. `None` when the series is empty or does not start positive.
pub fn cagr(values: &[f64]) -> Option<f64> {
    let first = *values.first()?;
    let last = *values.last()?;
    if !(first.is_finite() && first > 0.0 && last.is_finite()) {
        return None;
    }
    let total_return = last / first - 1.0;
    let years = values.len() as f64 / TRADING_DAYS_PER_YEAR as f64;
    Some((1.0 + total_return).powf(1.0 / years) - 1.0)
}

/// Deepest peak-to-trough decline. `drawdown` is negative or zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawdown {
    pub drawdown: f64,
    pub peak_value: f64,
    pub peak_date: NaiveDate,
    pub trough_value: f64,
    pub trough_date: NaiveDate,
}

/// Single chronological scan with a running peak. A series that never
/// falls reports a zero drawdown anchored at its first point.
pub fn max_drawdown(dates: &[NaiveDate], values: &[f64]) -> Option<Drawdown> {
    let (&first_date, &first_value) = dates.first().zip(values.first())?;

    let mut peak = (first_date, first_value);
    let mut worst = Drawdown {
        drawdown: 0.0,
        peak_value: first_value,
        peak_date: first_date,
        trough_value: first_value,
        trough_date: first_date,
    };

    for (&date, &value) in dates.iter().zip(values) {
        if value > peak.1 {
            peak = (date, value);
        }
        if peak.1 <= 0.0 {
            continue;
        }
        let dd = (value - peak.1) / peak.1;
        // strict: the earliest peak producing the minimum wins
        if dd < worst.drawdown {
            worst = Drawdown {
                drawdown: dd,
                peak_value: peak.1,
                peak_date: peak.0,
                trough_value: value,
                trough_date: date,
            };
        }
    }

    Some(worst)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub ratio: f64,
}

/// Sharpe ratio per consecutive block of 252 returns; the last block may
/// be shorter.
///
/// `(mean * 252 - rf) / (std * sqrt(252))` with `rf` the mean of
/// `risk_free` over the block's dates, or 0 without a series. Blocks with
/// fewer than two returns or no dispersion report 0.
pub fn rolling_sharpe(
    returns: &ReturnTable,
    risk_free: Option<&PriceSeries>,
) -> Result<Vec<SharpePeriod>, RebalancerError> {
    let annual = TRADING_DAYS_PER_YEAR as f64;

    returns
        .dates
        .chunks(TRADING_DAYS_PER_YEAR)
        .zip(returns.total_return.chunks(TRADING_DAYS_PER_YEAR))
        .map(|(dates, block)| {
            let start = dates[0];
            let end = dates[dates.len() - 1];

            let rf = match risk_free {
                Some(series) => {
                    let (_, rates) = series.between(start, end);
                    let finite: Vec<f64> =
                        rates.iter().copied().filter(|r| r.is_finite()).collect();
                    if finite.is_empty() {
                        return Err(RebalancerError::RiskFreeGap { start, end });
                    }
                    finite.iter().sum::<f64>() / finite.len() as f64
                }
                None => 0.0,
            };

            let ratio = match sample_std(block) {
                Some(std) if std > 0.0 => {
                    let mean = block.iter().sum::<f64>() / block.len() as f64;
                    (mean * annual - rf) / (std * annual.sqrt())
                }
                _ => 0.0,
            };

            Ok(SharpePeriod { start, end, ratio })
        })
        .collect()
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Headline statistics of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub final_value: f64,
    pub total_return: f64,
    pub cagr: Option<f64>,
    pub max_drawdown: Option<Drawdown>,
    pub sharpe: Vec<SharpePeriod>,
}

impl PerformanceSummary {
    pub fn compute(
        curve: &ValueTable,
        returns: &ReturnTable,
        risk_free: Option<&PriceSeries>,
    ) -> Result<Self, RebalancerError> {
        Ok(PerformanceSummary {
            final_value: curve.last_total().unwrap_or(0.0),
            total_return: returns.final_cum_return().unwrap_or(0.0),
            cagr: cagr(&curve.total),
            max_drawdown: max_drawdown(&curve.dates, &curve.total),
            sharpe: rolling_sharpe(returns, risk_free)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn days(n: usize) -> Vec<NaiveDate> {
        (0..n as i64)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i))
            .collect()
    }

    #[test]
    fn returns_drop_first_row() {
        let dates = days(3);
        let table = ReturnTable::from_values(&dates, &[1000.0, 1100.0, 1210.0]);
        assert_eq!(table.dates, dates[1..].to_vec());
        assert_relative_eq!(table.total_return[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(table.total_return[1], 0.10, epsilon = 1e-12);
        assert_relative_eq!(table.cum_return[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(table.cum_return[1], 0.21, epsilon = 1e-12);
    }

    #[test]
    fn undefined_returns_are_zero() {
        let dates = days(4);
        let table = ReturnTable::from_values(&dates, &[0.0, 0.0, 5.0, f64::NAN]);
        assert_eq!(table.total_return, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn single_value_has_no_returns() {
        let table = ReturnTable::from_values(&days(1), &[100.0]);
        assert!(table.is_empty());
        assert_eq!(table.final_cum_return(), None);
    }

    #[test]
    fn cagr_flat_year_is_zero() {
        assert_relative_eq!(cagr(&[100.0; 252]).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn cagr_one_year_matches_total_return() {
        let mut values = vec![100.0; 252];
        values[251] = 110.0;
        assert_relative_eq!(cagr(&values).unwrap(), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn cagr_two_years() {
        let mut values = vec![100.0; 504];
        values[503] = 121.0;
        assert_relative_eq!(cagr(&values).unwrap(), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn cagr_rejects_bad_input() {
        assert_eq!(cagr(&[]), None);
        assert_eq!(cagr(&[0.0, 10.0]), None);
        assert_eq!(cagr(&[f64::NAN, 10.0]), None);
    }

    #[test]
    fn drawdown_peak_and_trough() {
        let dates = days(5);
        let dd = max_drawdown(&dates, &[100.0, 120.0, 90.0, 95.0, 130.0]).unwrap();
        assert_relative_eq!(dd.drawdown, -0.25, epsilon = 1e-12);
        assert_eq!(dd.peak_value, 120.0);
        assert_eq!(dd.peak_date, dates[1]);
        assert_eq!(dd.trough_value, 90.0);
        assert_eq!(dd.trough_date, dates[2]);
    }

    #[test]
    fn drawdown_picks_deepest_decline() {
        let dates = days(6);
        let dd = max_drawdown(&dates, &[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]).unwrap();
        assert_relative_eq!(dd.drawdown, (80.0 - 110.0) / 110.0, epsilon = 1e-12);
        assert_eq!(dd.trough_date, dates[4]);
    }

    #[test]
    fn drawdown_tie_keeps_first_peak() {
        let dates = days(5);
        let dd = max_drawdown(&dates, &[100.0, 80.0, 100.0, 80.0, 90.0]).unwrap();
        assert_relative_eq!(dd.drawdown, -0.2, epsilon = 1e-12);
        assert_eq!(dd.peak_date, dates[0]);
        assert_eq!(dd.trough_date, dates[1]);
    }

    #[test]
    fn drawdown_of_rising_series_is_zero() {
        let dates = days(3);
        let dd = max_drawdown(&dates, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(dd.drawdown, 0.0);
        assert_eq!(dd.peak_date, dates[0]);
        assert_eq!(dd.trough_date, dates[0]);
        assert!(max_drawdown(&[], &[]).is_none());
    }

    #[test]
    fn sharpe_blocks_of_252() {
        let n = 600;
        let dates = days(n + 1);
        let values: Vec<f64> = (0..=n)
            .map(|i| 100.0 * (1.0 + 0.001 * i as f64) + if i % 2 == 0 { 0.3 } else { 0.0 })
            .collect();
        let returns = ReturnTable::from_values(&dates, &values);
        let periods = rolling_sharpe(&returns, None).unwrap();

        assert_eq!(periods.len(), 3);
        assert_eq!(periods[0].start, dates[1]);
        assert_eq!(periods[0].end, dates[252]);
        assert_eq!(periods[1].start, dates[253]);
        assert_eq!(periods[2].end, dates[n]);
        assert!(periods.iter().all(|p| p.ratio > 0.0));
    }

    #[test]
    fn sharpe_exact_multiple_has_no_empty_block() {
        let dates = days(253);
        let values: Vec<f64> = (0..253).map(|i| 100.0 + (i % 3) as f64).collect();
        let returns = ReturnTable::from_values(&dates, &values);
        assert_eq!(rolling_sharpe(&returns, None).unwrap().len(), 1);
    }

    #[test]
    fn sharpe_formula_with_risk_free() {
        let dates = days(4);
        let returns = ReturnTable {
            dates: dates[1..].to_vec(),
            total_return: vec![0.01, -0.01, 0.03],
            cum_return: vec![0.0; 3],
        };
        let rf = PriceSeries::new(dates.clone(), vec![9.0, 1.0, 2.0, 3.0]).unwrap();
        let periods = rolling_sharpe(&returns, Some(&rf)).unwrap();

        let mean: f64 = 0.01;
        let std = (((0.0f64).powi(2) + 0.02f64.powi(2) + 0.02f64.powi(2)) / 2.0).sqrt();
        let expected = (mean * 252.0 - 2.0) / (std * 252f64.sqrt());
        assert_relative_eq!(periods[0].ratio, expected, epsilon = 1e-9);
    }

    #[test]
    fn sharpe_flat_block_is_zero() {
        let dates = days(5);
        let returns = ReturnTable::from_values(&dates, &[100.0; 5]);
        let periods = rolling_sharpe(&returns, None).unwrap();
        assert_eq!(periods[0].ratio, 0.0);
    }

    #[test]
    fn sharpe_risk_free_gap_is_error() {
        let dates = days(4);
        let returns = ReturnTable::from_values(&dates, &[100.0, 101.0, 99.0, 102.0]);
        let later = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let rf = PriceSeries::new(vec![later], vec![1.0]).unwrap();
        assert!(matches!(
            rolling_sharpe(&returns, Some(&rf)),
            Err(RebalancerError::RiskFreeGap { .. })
        ));
    }

    #[test]
    fn benchmark_returns_clip_to_period() {
        let dates = days(5);
        let series = PriceSeries::new(dates.clone(), vec![50.0, 100.0, 110.0, 121.0, 1.0]).unwrap();
        let table = benchmark_returns(&series, dates[1], dates[3]);
        assert_eq!(table.dates, vec![dates[2], dates[3]]);
        assert_relative_eq!(table.cum_return[1], 0.21, epsilon = 1e-12);
    }

    #[test]
    fn summary_of_curve() {
        let mut curve = ValueTable::new(vec!["A".into()]);
        for (d, v) in days(3).into_iter().zip([1000.0, 1100.0, 1210.0]) {
            curve.push_row(d, vec![v]);
        }
        let returns = ReturnTable::from_curve(&curve);
        let summary = PerformanceSummary::compute(&curve, &returns, None).unwrap();
        assert_eq!(summary.final_value, 1210.0);
        assert_relative_eq!(summary.total_return, 0.21, epsilon = 1e-12);
        assert_eq!(summary.max_drawdown.unwrap().drawdown, 0.0);
        assert_eq!(summary.sharpe.len(), 1);
    }
}
