//! `gemsweep pareto`: approximate Pareto frontier over resource axes.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use gemsweep_analysis::{best_per_group, pareto, variable_parameters, Selector};

pub const DEFAULT_AXES: [&str; 3] = ["rob_size", "iq_size", "simd_phreg_count"];
pub const DEFAULT_THRESHOLDS: [f64; 5] = [0.5, 0.75, 0.85, 0.90, 0.95];

/// Rows are first reduced to the best `target` per configuration of the
/// parameters that are not analysis axes, then searched per threshold.
pub fn run(
    input: &Path,
    axes: &[String],
    target: &str,
    thresholds: &[f64],
    select: &[String],
    output: Option<&Path>,
) -> Result<()> {
    let table = super::load_results(input)?;
    let table = Selector::parse(select)?.apply(&table)?;
    let keys = variable_parameters(&table, axes);
    let reduced = best_per_group(&table, &keys, target)?;
    info!(rows = reduced.row_count(), groups_by = ?keys, "reduced before frontier search");
    let frontier = pareto(&reduced, axes, target, thresholds)?;
    super::emit(&frontier, output)
}
