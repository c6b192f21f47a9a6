//! CLI command implementations.

pub mod best;
pub mod extract;
pub mod pareto;
pub mod summary;
pub mod sweep;
pub mod tiling;
pub mod worker;

use std::path::Path;

use anyhow::{Context, Result};

use gemsweep_analysis::{add_derived_metrics, extract_dir_strict, render_table, DerivedConfig, ExtractOptions};
use gemsweep_table::{read_table, write_table_with_flags, GstFlags, Table};

/// Load a results file, or a whole results directory, with derived
/// metrics added.
pub fn load_results(path: &Path) -> Result<Table> {
    if path.is_dir() {
        return extract_dir_strict(path, &ExtractOptions::default())
            .with_context(|| format!("extracting {}", path.display()));
    }
    let mut table = read_table(path).with_context(|| format!("reading {}", path.display()))?;
    add_derived_metrics(&mut table, &DerivedConfig::default())
        .with_context(|| format!("deriving metrics for {}", path.display()))?;
    Ok(table)
}

/// Write `table` to `output` when given, print it otherwise.
pub fn emit(table: &Table, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            write_table_with_flags(path, table, GstFlags::new(GstFlags::EXTRACTED))
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} rows to {}", table.row_count(), path.display());
        }
        None => print!("{}", render_table(table)),
    }
    Ok(())
}
