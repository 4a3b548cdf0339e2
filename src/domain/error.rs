//! Domain error types.

use chrono::NaiveDate;

/// Failure of a single calendar lookup against the price panel.
///
/// Both variants are recoverable at the point of one lookup; the
/// orchestrator turns them into a fatal [`RebalanceError`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalendarError {
    #[error("{date} is not a trading day in the price panel")]
    NotATradingDay { date: NaiveDate },

    #[error("offset {offset} from {date} falls outside the panel (0..{len})")]
    OutOfRange {
        date: NaiveDate,
        offset: isize,
        len: usize,
    },
}

/// Structural problems found while building a price panel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PanelError {
    #[error("price panel has no rows")]
    Empty,

    #[error("price panel has no asset columns")]
    NoAssets,

    #[error("duplicate asset column: {0}")]
    DuplicateAsset(String),

    #[error("duplicate trading date: {0}")]
    DuplicateDate(NaiveDate),

    #[error("date index not increasing at {date} (after {previous})")]
    UnsortedIndex {
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("row {date} has {found} prices, expected {expected}")]
    RowWidth {
        date: NaiveDate,
        expected: usize,
        found: usize,
    },

    #[error("invalid price {value} for {asset} on {date}")]
    InvalidPrice {
        asset: String,
        date: NaiveDate,
        value: f64,
    },
}

/// Problems with a caller-supplied weight mapping.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("weight references unknown asset: {0}")]
    UnknownAsset(String),

    #[error("weight for {asset} is not finite")]
    NonFinite { asset: String },

    #[error("weight for {asset} is negative: {weight}")]
    Negative { asset: String, weight: f64 },

    #[error("weights sum to {total}, expected 1")]
    BadSum { total: f64 },
}

/// Fatal failure of a rebalancing run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RebalanceError {
    #[error(
        "rebalancing aborted at iteration {iteration} ({date}, capital {capital:.2}): {source}"
    )]
    Calendar {
        iteration: usize,
        date: NaiveDate,
        capital: f64,
        #[source]
        source: CalendarError,
    },

    #[error(
        "rebalancing aborted at iteration {iteration} ({date}, capital {capital:.2}): \
         strategy has {available} days of history, needs {required}"
    )]
    InsufficientHistory {
        iteration: usize,
        date: NaiveDate,
        capital: f64,
        available: usize,
        required: usize,
    },

    #[error(
        "rebalancing aborted at iteration {iteration} ({date}, capital {capital:.2}): \
         no asset has a trailing score"
    )]
    NoScoredAssets {
        iteration: usize,
        date: NaiveDate,
        capital: f64,
    },

    #[error("rebalance period must be at least one trading day")]
    ZeroPeriod,

    #[error("initial investment must be positive, got {0}")]
    NonPositiveCapital(f64),

    #[error("rebalancing cancelled after iteration {iteration}")]
    Cancelled { iteration: usize },
}

/// Top-level error type for rebalancer.
#[derive(Debug, thiserror::Error)]
pub enum RebalancerError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Panel(#[from] PanelError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Weights(#[from] WeightError),

    #[error(transparent)]
    Rebalance(#[from] RebalanceError),

    #[error("risk-free series has no rates between {start} and {end}")]
    RiskFreeGap { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RebalancerError> for std::process::ExitCode {
    fn from(err: &RebalancerError) -> Self {
        let code: u8 = match err {
            RebalancerError::Io(_) => 1,
            RebalancerError::ConfigParse { .. }
            | RebalancerError::ConfigMissing { .. }
            | RebalancerError::ConfigInvalid { .. } => 2,
            RebalancerError::Data { .. } | RebalancerError::Panel(_) => 3,
            RebalancerError::Weights(_) => 4,
            RebalancerError::Calendar(_)
            | RebalancerError::Rebalance(_)
            | RebalancerError::RiskFreeGap { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
