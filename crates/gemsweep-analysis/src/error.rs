//! Error types for analysis queries.

use std::path::PathBuf;

use gemsweep_core::CoreError;
use gemsweep_table::TableError;

/// Errors raised while deriving metrics or querying a result table.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("column '{name}' not found")]
    MissingColumn { name: String },

    #[error("column '{column}' is not numeric in row {row}")]
    NotNumeric { column: String, row: usize },

    /// A divisor column held zero. This points at a misconfigured run
    /// rather than a measurement, so it is never papered over with NaN.
    #[error("division by zero: column '{column}' is 0 in row {row}")]
    DivisionByZero { column: String, row: usize },

    #[error("invalid selector '{raw}': expected key=value")]
    InvalidSelector { raw: String },

    #[error("pareto analysis needs at least two axes, got {count}")]
    TooFewAxes { count: usize },

    #[error("extraction of '{}' failed: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
