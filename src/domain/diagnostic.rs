//! Non-fatal anomalies attached to engine outputs.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Fewer trailing sessions than the lookback needs.
    InsufficientHistory {
        date: NaiveDate,
        available: usize,
        required: usize,
    },
    /// Window start is absent from the panel.
    NotATradingDay { date: NaiveDate },
    /// No asset has a finite trailing score; nothing can be allocated.
    NoScoredAssets { date: NaiveDate },
    /// No asset passed the strategy's filter; weights fell back to equal.
    NoEligibleAssets { date: NaiveDate },
    /// Scores left nothing to rank; weights fell back to equal.
    DegenerateScores { date: NaiveDate },
    /// A weight or share count names an asset missing from the price row.
    ShapeMismatch { asset: String },
    /// Positive weight on an asset without a usable price.
    MissingPrice { asset: String, date: NaiveDate },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InsufficientHistory {
                date,
                available,
                required,
            } => write!(
                f,
                "insufficient history before {date}: {available} days, need {required}"
            ),
            Diagnostic::NotATradingDay { date } => write!(f, "{date} is not a trading day"),
            Diagnostic::NoScoredAssets { date } => {
                write!(f, "no asset has a trailing score before {date}")
            }
            Diagnostic::NoEligibleAssets { date } => {
                write!(f, "no eligible assets at {date}, using equal weights")
            }
            Diagnostic::DegenerateScores { date } => {
                write!(f, "scores at {date} do not separate assets, using equal weights")
            }
            Diagnostic::ShapeMismatch { asset } => {
                write!(f, "{asset} is not a column of the price panel")
            }
            Diagnostic::MissingPrice { asset, date } => {
                write!(f, "no price for {asset} on {date}, holding zero shares")
            }
        }
    }
}
