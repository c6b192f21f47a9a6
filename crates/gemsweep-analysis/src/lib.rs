//! Analysis of gemsweep result tables.
//!
//! [`add_derived_metrics`] turns raw simulator counters into efficiency and
//! bandwidth figures; [`Selector`] and [`Targets`] narrow a table down;
//! [`best_per_group`], [`pareto`] and [`summarize`] answer the questions a
//! sweep is run for. [`extract_dir`] applies all of it to a directory of
//! result files.

pub mod derived;
pub mod error;
pub mod extract;
mod numeric;
pub mod query;
pub mod render;
pub mod select;
pub mod summary;

pub use derived::{
    add_derived_metrics, resolve_cycle_column, DerivedConfig, BYTES_READ_COLUMN, BYTES_WRITTEN_COLUMN,
    DEFAULT_CYCLE_COLUMN, DEFAULT_FMA_COLUMNS, EFFICIENCY_COLUMN, K_C_COLUMN, L1_BANDWIDTH_COLUMN,
    MIN_CYCLES_COLUMN, UNROLL_COLUMN,
};
pub use error::{AnalysisError, Result};
pub use extract::{extract_dir, extract_dir_strict, extract_file, ExtractOptions, Extraction};
pub use query::{best_per_group, pareto, variable_parameters, PARETO_THRESHOLD_COLUMN};
pub use render::render_table;
pub use select::{stat_columns, Selector, Targets};
pub use summary::{summarize, summary_table, BestKernel, DesignPointSummary, SummaryConfig, DEFAULT_THRESHOLD};
