//! `gemsweep summary`: one line per hardware design point.

use std::path::Path;

use anyhow::Result;

use gemsweep_analysis::{summarize, summary_table, Selector, SummaryConfig};

pub fn run(
    input: &Path,
    design_keys: Option<Vec<String>>,
    threshold: f64,
    select: &[String],
    output: Option<&Path>,
) -> Result<()> {
    let table = super::load_results(input)?;
    let table = Selector::parse(select)?.apply(&table)?;
    let mut config = SummaryConfig {
        threshold,
        ..SummaryConfig::default()
    };
    if let Some(keys) = design_keys {
        config.design_keys = keys;
    }
    let summaries = summarize(&table, &config)?;
    super::emit(&summary_table(&summaries)?, output)
}
