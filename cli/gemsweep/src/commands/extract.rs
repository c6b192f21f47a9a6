//! `gemsweep extract`: merge a directory of results into one table.

use std::path::Path;

use anyhow::{bail, Context, Result};

use gemsweep_analysis::{add_derived_metrics, extract_dir, ExtractOptions, Selector, Targets};
use gemsweep_table::{discover_tables, read_table};

pub fn run(
    stat_dir: &Path,
    select: &[String],
    targets: &[String],
    output: Option<&Path>,
    list_stats: bool,
    max_workers: Option<usize>,
) -> Result<()> {
    if !stat_dir.is_dir() {
        bail!("not a directory: {}", stat_dir.display());
    }
    let mut options = ExtractOptions {
        selector: Selector::parse(select)?,
        targets: Targets::parse(targets),
        ..ExtractOptions::default()
    };
    if let Some(workers) = max_workers {
        options.max_workers = workers;
    }

    if list_stats {
        for name in available_columns(stat_dir, &options)? {
            println!("{name}");
        }
        return Ok(());
    }

    let extraction = extract_dir(stat_dir, &options)?;
    for (path, reason) in &extraction.failed {
        eprintln!("skipped {}: {reason}", path.display());
    }
    println!(
        "Extracted {} rows from {} files",
        extraction.table.row_count(),
        extraction.files - extraction.failed.len()
    );
    super::emit(&extraction.table, output)
}

/// Column names of the first result file, derived metrics included.
pub fn available_columns(stat_dir: &Path, options: &ExtractOptions) -> Result<Vec<String>> {
    let files = discover_tables(stat_dir)?;
    let Some(first) = files.first() else {
        bail!("no result files in {}", stat_dir.display());
    };
    let mut table = read_table(first).with_context(|| format!("reading {}", first.display()))?;
    add_derived_metrics(&mut table, &options.derived)?;
    Ok(table.column_names().map(str::to_string).collect())
}
