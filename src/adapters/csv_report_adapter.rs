//! CSV report adapter.
//!
//! Writes the equity curve to `output_path`, one row per session with the
//! per-asset values, `Total_value`, the return columns and, when present,
//! the benchmark returns. Window summaries go to a sibling file with a
//! `_windows` suffix.

use crate::domain::error::RebalancerError;
use crate::domain::metrics::ReturnTable;
use crate::domain::valuation::TOTAL_VALUE;
use crate::ports::report_port::{ReportPort, RunReport};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn windows_path(output_path: &str) -> PathBuf {
        let path = Path::new(output_path);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        path.with_file_name(format!("{stem}_windows.csv"))
    }

    fn write_curve(report: &RunReport<'_>, path: &Path) -> Result<(), RebalancerError> {
        let curve = &report.result.equity_curve;
        let mut wtr = csv::Writer::from_path(path).map_err(write_error)?;

        let mut header = vec!["Date".to_string()];
        header.extend(curve.assets.iter().cloned());
        header.extend(
            [TOTAL_VALUE, "Total_return", "Cum_return"]
                .iter()
                .map(|s| s.to_string()),
        );
        if report.benchmark.is_some() {
            header.push("Benchmark_return".to_string());
            header.push("Benchmark_cum_return".to_string());
        }
        wtr.write_record(&header).map_err(write_error)?;

        let returns = by_date(report.returns);
        let benchmark = report.benchmark.map(by_date);

        for (i, date) in curve.dates.iter().enumerate() {
            let mut record = vec![date.to_string()];
            record.extend(curve.values[i].iter().map(|v| format_value(*v)));
            record.push(format_value(curve.total[i]));
            push_returns(&mut record, returns.get(date));
            if let Some(bench) = &benchmark {
                push_returns(&mut record, bench.get(date));
            }
            wtr.write_record(&record).map_err(write_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_windows(report: &RunReport<'_>, path: &Path) -> Result<(), RebalancerError> {
        let mut wtr = csv::Writer::from_path(path).map_err(write_error)?;
        wtr.write_record([
            "iteration",
            "start_date",
            "end_date",
            "starting_capital",
            "ending_value",
            "weights",
            "diagnostics",
        ])
        .map_err(write_error)?;

        for window in &report.result.windows {
            let weights = window
                .weights
                .iter()
                .filter(|(_, w)| *w > 0.0)
                .map(|(a, w)| format!("{a}={w:.4}"))
                .collect::<Vec<_>>()
                .join(";");
            let diagnostics = window
                .diagnostics
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            wtr.write_record([
                window.iteration.to_string(),
                window.start_date.to_string(),
                window.end_date.to_string(),
                format_value(window.starting_capital),
                format_value(window.ending_value),
                weights,
                diagnostics,
            ])
            .map_err(write_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &RunReport<'_>, output_path: &str) -> Result<(), RebalancerError> {
        Self::write_curve(report, Path::new(output_path))?;
        let windows = Self::windows_path(output_path);
        Self::write_windows(report, &windows)?;
        info!(
            strategy = report.strategy,
            output = output_path,
            windows = %windows.display(),
            "report written"
        );
        Ok(())
    }
}

fn by_date(table: &ReturnTable) -> HashMap<NaiveDate, (f64, f64)> {
    table
        .dates
        .iter()
        .zip(table.total_return.iter().zip(&table.cum_return))
        .map(|(d, (r, c))| (*d, (*r, *c)))
        .collect()
}

fn push_returns(record: &mut Vec<String>, entry: Option<&(f64, f64)>) {
    match entry {
        Some((r, c)) => {
            record.push(format!("{r:.8}"));
            record.push(format!("{c:.8}"));
        }
        None => {
            record.push(String::new());
            record.push(String::new());
        }
    }
}

fn format_value(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.4}")
    } else {
        String::new()
    }
}

fn write_error(e: csv::Error) -> RebalancerError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => RebalancerError::Io(io),
        other => RebalancerError::Data {
            reason: format!("CSV write error: {:?}", other),
        },
    }
}
