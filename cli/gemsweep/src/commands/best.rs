//! `gemsweep best`: the best row of every group.

use std::path::Path;

use anyhow::Result;

use gemsweep_analysis::{best_per_group, Selector};

pub fn run(input: &Path, group_by: &[String], metric: &str, select: &[String], output: Option<&Path>) -> Result<()> {
    let table = super::load_results(input)?;
    let table = Selector::parse(select)?.apply(&table)?;
    let best = best_per_group(&table, group_by, metric)?;
    super::emit(&best, output)
}
