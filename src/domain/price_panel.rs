//! Date-indexed price table shared read-only by every engine component.
//!
//! Rows are trading days in strictly increasing order, columns are assets.
//! A NaN price marks an asset that is not listed yet on that day.

use crate::domain::error::PanelError;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PricePanel {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    rows: Vec<Vec<f64>>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PricePanel {
    pub fn new(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, PanelError> {
        if dates.is_empty() {
            return Err(PanelError::Empty);
        }
        if assets.is_empty() {
            return Err(PanelError::NoAssets);
        }

        let mut seen = HashMap::with_capacity(assets.len());
        for asset in &assets {
            if seen.insert(asset.as_str(), ()).is_some() {
                return Err(PanelError::DuplicateAsset(asset.clone()));
            }
        }

        for pair in dates.windows(2) {
            if pair[1] == pair[0] {
                return Err(PanelError::DuplicateDate(pair[1]));
            }
            if pair[1] < pair[0] {
                return Err(PanelError::UnsortedIndex {
                    previous: pair[0],
                    date: pair[1],
                });
            }
        }

        if rows.len() != dates.len() {
            return Err(PanelError::RowWidth {
                date: dates[rows.len().min(dates.len() - 1)],
                expected: dates.len(),
                found: rows.len(),
            });
        }

        for (date, row) in dates.iter().zip(&rows) {
            if row.len() != assets.len() {
                return Err(PanelError::RowWidth {
                    date: *date,
                    expected: assets.len(),
                    found: row.len(),
                });
            }
            for (asset, &value) in assets.iter().zip(row) {
                if !value.is_nan() && !(value.is_finite() && value > 0.0) {
                    return Err(PanelError::InvalidPrice {
                        asset: asset.clone(),
                        date: *date,
                        value,
                    });
                }
            }
        }

        let date_index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        Ok(Self {
            dates,
            assets,
            rows,
            date_index,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Row index of the last trading day.
    pub fn last_offset(&self) -> usize {
        self.dates.len() - 1
    }

    pub fn date_at(&self, offset: usize) -> Option<NaiveDate> {
        self.dates.get(offset).copied()
    }

    pub(crate) fn offset_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn row(&self, offset: usize) -> Option<&[f64]> {
        self.rows.get(offset).map(Vec::as_slice)
    }

    /// Prices of every asset on the trading day at `offset`.
    pub fn price_row(&self, offset: usize) -> Option<PriceRow<'_>> {
        Some(PriceRow {
            date: self.date_at(offset)?,
            assets: &self.assets,
            prices: self.row(offset)?,
        })
    }

    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Case-insensitive column lookup, returning the panel's spelling.
    pub fn resolve_asset(&self, name: &str) -> Option<&str> {
        self.assets
            .iter()
            .find(|a| a.as_str() == name)
            .or_else(|| self.assets.iter().find(|a| a.eq_ignore_ascii_case(name)))
            .map(String::as_str)
    }

    /// Inclusive view over rows `start..=end`.
    pub fn slice(&self, start: usize, end: usize) -> Option<PanelSlice<'_>> {
        if start > end || end >= self.len() {
            return None;
        }
        Some(PanelSlice {
            panel: self,
            start,
            end,
        })
    }
}

/// One trading day's prices, aligned with `assets`.
#[derive(Debug, Clone, Copy)]
pub struct PriceRow<'a> {
    pub date: NaiveDate,
    pub assets: &'a [String],
    pub prices: &'a [f64],
}

impl PriceRow<'_> {
    pub fn price(&self, asset: &str) -> Option<f64> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|j| self.prices[j])
    }
}

/// Borrowed contiguous run of trading days.
#[derive(Debug, Clone, Copy)]
pub struct PanelSlice<'a> {
    panel: &'a PricePanel,
    start: usize,
    end: usize,
}

impl<'a> PanelSlice<'a> {
    pub fn start_offset(&self) -> usize {
        self.start
    }

    pub fn end_offset(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn assets(&self) -> &'a [String] {
        &self.panel.assets
    }

    pub fn dates(&self) -> &'a [NaiveDate] {
        &self.panel.dates[self.start..=self.end]
    }

    pub fn rows(&self) -> &'a [Vec<f64>] {
        &self.panel.rows[self.start..=self.end]
    }
}

/// Single date-indexed value column, e.g. a benchmark close or a
/// risk-free rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl PriceSeries {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, PanelError> {
        if dates.is_empty() {
            return Err(PanelError::Empty);
        }
        if dates.len() != values.len() {
            return Err(PanelError::RowWidth {
                date: dates[0],
                expected: dates.len(),
                found: values.len(),
            });
        }
        for pair in dates.windows(2) {
            if pair[1] == pair[0] {
                return Err(PanelError::DuplicateDate(pair[1]));
            }
            if pair[1] < pair[0] {
                return Err(PanelError::UnsortedIndex {
                    previous: pair[0],
                    date: pair[1],
                });
            }
        }
        Ok(Self { dates, values })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Entries with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> (&[NaiveDate], &[f64]) {
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end).max(lo);
        (&self.dates[lo..hi], &self.values[lo..hi])
    }
}
