#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use rebalancer::domain::error::RebalancerError;
use rebalancer::domain::price_panel::{PricePanel, PriceSeries};
use rebalancer::ports::data_port::DataPort;
use rebalancer::ports::report_port::{ReportPort, RunReport};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

/// `n` weekdays starting at 2020-01-02.
pub fn trading_days(n: usize) -> Vec<NaiveDate> {
    let mut date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let mut days = Vec::with_capacity(n);
    while days.len() < n {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(date);
        }
        date = date.succ_opt().unwrap();
    }
    days
}

/// Deterministic prices: each asset drifts at its own rate with a
/// wobble, so momentum and volatility differ across assets.
pub fn synthetic_panel(assets: &[&str], n: usize) -> PricePanel {
    let dates = trading_days(n);
    let rows = (0..n)
        .map(|i| {
            assets
                .iter()
                .enumerate()
                .map(|(j, _)| {
                    let drift = 1.0 + 0.0004 * (j as f64 - 1.0);
                    let wobble = 1.0 + 0.01 * ((i * (j + 2)) as f64 * 0.37).sin();
                    100.0 * drift.powi(i as i32) * wobble
                })
                .collect()
        })
        .collect();
    PricePanel::new(dates, assets.iter().map(|s| s.to_string()).collect(), rows).unwrap()
}

/// `synthetic_panel` with asset `j` unlisted (NaN) before row `listed[j]`.
pub fn late_listed_panel(assets: &[&str], n: usize, listed: &[usize]) -> PricePanel {
    let full = synthetic_panel(assets, n);
    let rows = (0..n)
        .map(|i| {
            full.row(i)
                .unwrap()
                .iter()
                .zip(listed)
                .map(|(&p, &from)| if i < from { f64::NAN } else { p })
                .collect()
        })
        .collect();
    PricePanel::new(full.dates().to_vec(), full.assets().to_vec(), rows).unwrap()
}

pub fn flat_panel(assets: &[&str], n: usize, price: f64) -> PricePanel {
    PricePanel::new(
        trading_days(n),
        assets.iter().map(|s| s.to_string()).collect(),
        vec![vec![price; assets.len()]; n],
    )
    .unwrap()
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Wide CSV (`Date,<asset>...`) of `panel` at `dir/name`.
pub fn write_panel_csv(dir: &Path, name: &str, panel: &PricePanel) {
    let mut out = String::from("Date");
    for asset in panel.assets() {
        out.push(',');
        out.push_str(asset);
    }
    out.push('\n');
    for (i, date) in panel.dates().iter().enumerate() {
        out.push_str(&date.to_string());
        for price in panel.row(i).unwrap() {
            out.push(',');
            if !price.is_nan() {
                out.push_str(&price.to_string());
            }
        }
        out.push('\n');
    }
    fs::write(dir.join(name), out).unwrap();
}

pub fn write_series_csv(dir: &Path, name: &str, dates: &[NaiveDate], values: &[f64]) {
    let mut out = String::from("Date,Close\n");
    for (d, v) in dates.iter().zip(values) {
        out.push_str(&format!("{d},{v}\n"));
    }
    fs::write(dir.join(name), out).unwrap();
}

pub struct MockDataPort {
    pub panels: HashMap<String, PricePanel>,
    pub series: HashMap<String, PriceSeries>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            panels: HashMap::new(),
            series: HashMap::new(),
        }
    }

    pub fn with_panel(mut self, source: &str, panel: PricePanel) -> Self {
        self.panels.insert(source.to_string(), panel);
        self
    }

    pub fn with_series(mut self, source: &str, series: PriceSeries) -> Self {
        self.series.insert(source.to_string(), series);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_panel(&self, source: &str) -> Result<PricePanel, RebalancerError> {
        self.panels
            .get(source)
            .cloned()
            .ok_or_else(|| RebalancerError::Data {
                reason: format!("no panel {source}"),
            })
    }

    fn fetch_series(&self, source: &str) -> Result<PriceSeries, RebalancerError> {
        self.series
            .get(source)
            .cloned()
            .ok_or_else(|| RebalancerError::Data {
                reason: format!("no series {source}"),
            })
    }
}

/// Records what a run would have written.
#[derive(Default)]
pub struct RecordingReportPort {
    pub written: RefCell<Vec<(String, usize, Option<f64>)>>,
}

impl ReportPort for RecordingReportPort {
    fn write(&self, report: &RunReport<'_>, output_path: &str) -> Result<(), RebalancerError> {
        self.written.borrow_mut().push((
            output_path.to_string(),
            report.result.windows.len(),
            report.summary.cagr,
        ));
        Ok(())
    }
}
