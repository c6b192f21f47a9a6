//! Per-design-point summary of kernel efficiency.
//!
//! A design point is one combination of hardware parameters (by default
//! SIMD unit count, width and latency). For each, the summary counts the
//! kernels that reach the efficiency threshold and reports the best one.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use gemsweep_core::Field;
use gemsweep_table::{Column, Table, Value};

use crate::derived::{resolve_cycle_column, DEFAULT_CYCLE_COLUMN, EFFICIENCY_COLUMN, K_C_COLUMN};
use crate::error::Result;
use crate::numeric::{group_key, numeric_column};

pub const DEFAULT_THRESHOLD: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SummaryConfig {
    pub design_keys: Vec<String>,
    pub threshold: f64,
    pub cycle_column: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            design_keys: [Field::SimdCount, Field::SimdWidth, Field::SimdLat]
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
            threshold: DEFAULT_THRESHOLD,
            cycle_column: DEFAULT_CYCLE_COLUMN.to_string(),
        }
    }
}

/// The most efficient kernel of a design point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestKernel {
    pub efficiency: f64,
    pub mr: u32,
    pub nr: u32,
    pub k_c: u32,
    pub cycles: f64,
    /// `mr*nr + 1 + 2*mr` vector registers.
    pub min_arch_registers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignPointSummary {
    pub design: Vec<(String, Value)>,
    /// Distinct `(mr, nr)` kernels with efficiency above the threshold.
    pub good_kernels: usize,
    pub best: BestKernel,
}

/// Summarize `table` per design point, ordered by design-key values.
pub fn summarize(table: &Table, config: &SummaryConfig) -> Result<Vec<DesignPointSummary>> {
    let efficiency = numeric_column(table, EFFICIENCY_COLUMN)?;
    let mr = numeric_column(table, Field::Mr.name())?;
    let nr = numeric_column(table, Field::Nr.name())?;
    let k_c = numeric_column(table, K_C_COLUMN)?;
    let cycles = numeric_column(table, &resolve_cycle_column(table, &config.cycle_column)?)?;
    let mut keys: Vec<(&str, &[Value])> = Vec::with_capacity(config.design_keys.len());
    for k in &config.design_keys {
        keys.push((k.as_str(), table.column(k).ok_or_else(|| missing(k))?));
    }

    let mut groups: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    let mut first_rows: Vec<usize> = Vec::new();
    for row in 0..table.row_count() {
        let key: Vec<String> = keys.iter().map(|(_, c)| group_key(&c[row])).collect();
        groups
            .entry(key)
            .or_insert_with(|| {
                first_rows.push(row);
                Vec::new()
            })
            .push(row);
    }

    let design_of = |row: usize| -> Vec<(String, Value)> {
        keys.iter().map(|(k, c)| (k.to_string(), c[row].clone())).collect()
    };
    first_rows.sort_by(|&a, &b| compare_designs(&design_of(a), &design_of(b)));

    let mut out = Vec::with_capacity(first_rows.len());
    for first in first_rows {
        let key: Vec<String> = keys.iter().map(|(_, c)| group_key(&c[first])).collect();
        let rows = &groups[&key];

        let good: HashSet<(u64, u64)> = rows
            .iter()
            .filter(|&&r| efficiency[r] > config.threshold)
            .map(|&r| (mr[r].to_bits(), nr[r].to_bits()))
            .collect();

        // With good kernels present the overall maximum is one of them.
        let mut best_row = rows[0];
        for &r in rows {
            if efficiency[r] > efficiency[best_row] {
                best_row = r;
            }
        }
        let (m, n) = (mr[best_row] as u32, nr[best_row] as u32);
        out.push(DesignPointSummary {
            design: design_of(first),
            good_kernels: good.len(),
            best: BestKernel {
                efficiency: efficiency[best_row],
                mr: m,
                nr: n,
                k_c: k_c[best_row] as u32,
                cycles: cycles[best_row],
                min_arch_registers: m * n + 1 + 2 * m,
            },
        });
    }
    Ok(out)
}

/// Tabulate summaries for printing or saving.
pub fn summary_table(summaries: &[DesignPointSummary]) -> Result<Table> {
    let rows = summaries.len();
    let mut columns: Vec<Column> = Vec::new();
    if let Some(first) = summaries.first() {
        for (i, (name, _)) in first.design.iter().enumerate() {
            columns.push(Column {
                name: name.clone(),
                values: summaries.iter().map(|s| s.design[i].1.clone()).collect(),
            });
        }
    }
    let mut push = |name: &str, values: Vec<Value>| {
        columns.push(Column {
            name: name.to_string(),
            values,
        })
    };
    push("ngood", summaries.iter().map(|s| Value::Int(s.good_kernels as i64)).collect());
    push("efficiency", summaries.iter().map(|s| Value::Float(s.best.efficiency)).collect());
    push("mr", summaries.iter().map(|s| Value::from(s.best.mr)).collect());
    push("nr", summaries.iter().map(|s| Value::from(s.best.nr)).collect());
    push("k_c", summaries.iter().map(|s| Value::from(s.best.k_c)).collect());
    push("cycles", summaries.iter().map(|s| Value::Float(s.best.cycles)).collect());
    push(
        "nr_arch_min",
        summaries.iter().map(|s| Value::from(s.best.min_arch_registers)).collect(),
    );
    Ok(Table::from_columns(rows, columns)?)
}

fn missing(name: &str) -> crate::error::AnalysisError {
    crate::error::AnalysisError::MissingColumn {
        name: name.to_string(),
    }
}

fn compare_designs(a: &[(String, Value)], b: &[(String, Value)]) -> Ordering {
    for ((_, x), (_, y)) in a.iter().zip(b) {
        let ord = match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => x.to_string().cmp(&y.to_string()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
