//! Portfolio valuation and the value tables it produces.

use crate::domain::diagnostic::Diagnostic;
use crate::domain::price_panel::PanelSlice;
use crate::domain::sizing::ShareCounts;
use chrono::NaiveDate;

pub const TOTAL_VALUE: &str = "Total_value";

/// Date-indexed holdings value: one column per asset (shares × price)
/// plus the row total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueTable {
    pub dates: Vec<NaiveDate>,
    pub assets: Vec<String>,
    pub values: Vec<Vec<f64>>,
    pub total: Vec<f64>,
}

impl ValueTable {
    pub fn new(assets: Vec<String>) -> Self {
        Self {
            assets,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn last_total(&self) -> Option<f64> {
        self.total.last().copied()
    }

    pub fn column(&self, asset: &str) -> Option<Vec<f64>> {
        let j = self.assets.iter().position(|a| a == asset)?;
        Some(self.values.iter().map(|row| row[j]).collect())
    }

    pub fn push_row(&mut self, date: NaiveDate, values: Vec<f64>) {
        let total = values.iter().filter(|v| v.is_finite()).sum();
        self.dates.push(date);
        self.values.push(values);
        self.total.push(total);
    }

    /// Concatenates `next` on the date axis, keeping only the columns both
    /// tables share. Rows of `self` dated on or after `next`'s first date
    /// are replaced by `next`'s rows, so dates stay strictly increasing.
    pub fn append(&mut self, next: ValueTable) {
        let Some(first) = next.first_date() else {
            return;
        };
        if self.is_empty() {
            *self = next;
            return;
        }

        let keep = self.dates.partition_point(|d| *d < first);
        self.dates.truncate(keep);
        self.values.truncate(keep);
        self.total.truncate(keep);

        let shared: Vec<(usize, usize)> = self
            .assets
            .iter()
            .enumerate()
            .filter_map(|(i, a)| next.assets.iter().position(|b| b == a).map(|j| (i, j)))
            .collect();

        if shared.len() != self.assets.len() {
            let columns: Vec<usize> = shared.iter().map(|(i, _)| *i).collect();
            self.assets = columns.iter().map(|&i| self.assets[i].clone()).collect();
            for row in &mut self.values {
                *row = columns.iter().map(|&i| row[i]).collect();
            }
            self.total = self
                .values
                .iter()
                .map(|row| row.iter().filter(|v| v.is_finite()).sum())
                .collect();
        }

        for (date, row) in next.dates.into_iter().zip(next.values) {
            let values = shared.iter().map(|(_, j)| row[*j]).collect();
            self.push_row(date, values);
        }
    }
}

/// Value table for one window plus any column mismatches found.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub table: ValueTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Marks `shares` to market over every row of `prices`.
pub fn value(shares: &ShareCounts, prices: &PanelSlice<'_>) -> Valuation {
    let mut diagnostics = Vec::new();
    let columns: Vec<Option<usize>> = shares
        .assets
        .iter()
        .map(|asset| {
            let found = prices.assets().iter().position(|a| a == asset);
            if found.is_none() {
                diagnostics.push(Diagnostic::ShapeMismatch {
                    asset: asset.clone(),
                });
            }
            found
        })
        .collect();
    for asset in prices.assets() {
        if !shares.assets.contains(asset) {
            diagnostics.push(Diagnostic::ShapeMismatch {
                asset: asset.clone(),
            });
        }
    }

    let mut table = ValueTable::new(shares.assets.clone());
    for (date, row) in prices.dates().iter().zip(prices.rows()) {
        let values = shares
            .shares
            .iter()
            .zip(&columns)
            .map(|(&n, column)| match column {
                Some(j) if n != 0.0 && row[*j].is_finite() => n * row[*j],
                _ => 0.0,
            })
            .collect();
        table.push_row(*date, values);
    }

    Valuation { table, diagnostics }
}
