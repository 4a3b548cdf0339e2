//! CSV file data adapter.
//!
//! Panels are wide tables (`date,<asset>,<asset>,...`); series files need a
//! `Close` column or exactly one value column. Blank and `NaN` cells load
//! as NaN. Rows are sorted by date before the panel checks for duplicates.

use crate::domain::error::RebalancerError;
use crate::domain::price_panel::{PricePanel, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn read(&self, source: &str) -> Result<csv::Reader<std::io::Cursor<String>>, RebalancerError> {
        let path = self.base_path.join(source);
        let content = fs::read_to_string(&path).map_err(|e| RebalancerError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Ok(csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(std::io::Cursor::new(content)))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_panel(&self, source: &str) -> Result<PricePanel, RebalancerError> {
        let mut rdr = self.read(source)?;
        let headers = rdr.headers().map_err(csv_error)?.clone();
        let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(csv_error)?;
            let date = parse_date(record.get(0).unwrap_or_default())?;
            let prices = record
                .iter()
                .skip(1)
                .zip(&assets)
                .map(|(cell, asset)| parse_price(cell, asset))
                .collect::<Result<Vec<f64>, _>>()?;
            rows.push((date, prices));
        }

        rows.sort_by_key(|(date, _)| *date);
        let (dates, rows): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        debug!(source, rows = dates.len(), assets = assets.len(), "loaded price panel");
        Ok(PricePanel::new(dates, assets, rows)?)
    }

    fn fetch_series(&self, source: &str) -> Result<PriceSeries, RebalancerError> {
        let mut rdr = self.read(source)?;
        let headers = rdr.headers().map_err(csv_error)?.clone();
        let column = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("close"))
            .or((headers.len() == 2).then_some(1))
            .ok_or_else(|| RebalancerError::Data {
                reason: format!("{source}: no Close column"),
            })?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(csv_error)?;
            let date = parse_date(record.get(0).unwrap_or_default())?;
            let value = parse_price(record.get(column).unwrap_or_default(), "Close")?;
            points.push((date, value));
        }

        points.sort_by_key(|(date, _)| *date);
        let (dates, values): (Vec<_>, Vec<_>) = points.into_iter().unzip();
        debug!(source, rows = dates.len(), "loaded series");
        Ok(PriceSeries::new(dates, values)?)
    }
}

fn csv_error(e: csv::Error) -> RebalancerError {
    RebalancerError::Data {
        reason: format!("CSV parse error: {}", e),
    }
}

/// `YYYY-MM-DD`, optionally followed by a time of day.
fn parse_date(value: &str) -> Result<NaiveDate, RebalancerError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .map_err(|e| RebalancerError::Data {
            reason: format!("invalid date '{}': {}", value, e),
        })
}

fn parse_price(cell: &str, column: &str) -> Result<f64, RebalancerError> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse().map_err(|e| RebalancerError::Data {
        reason: format!("invalid {} value '{}': {}", column, cell, e),
    })
}
