//! Per-row derived metrics.
//!
//! Every derived column is a pure function of the row it sits in: the
//! kernel shape and cache geometry give `k_c` and `unroll` through the
//! blocking model, the committed FMA count gives the compute-bound cycle
//! floor, and the observed cycle count turns that into an efficiency.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gemsweep_core::{compute_blocking, Blocking, BlockingParams, Field, ParameterDomains};
use gemsweep_table::{Table, Value};

use crate::error::{AnalysisError, Result};
use crate::numeric::{numeric_column, parameter};

pub const K_C_COLUMN: &str = "k_c";
pub const UNROLL_COLUMN: &str = "unroll";
pub const MIN_CYCLES_COLUMN: &str = "minCyclesPossible";
pub const EFFICIENCY_COLUMN: &str = "efficiency";
pub const BYTES_READ_COLUMN: &str = "bytesRead";
pub const BYTES_WRITTEN_COLUMN: &str = "bytesWritten";
pub const L1_BANDWIDTH_COLUMN: &str = "l1bw";

pub const DEFAULT_CYCLE_COLUMN: &str = "system.cpu.numCycles";
pub const DEFAULT_FMA_COLUMNS: [&str; 2] = [
    "system.cpu.commitStats0.committedInstType::SimdFloatMultAcc",
    "system.cpu.commitStats0.committedInstType::SimdFloatMult",
];

/// Inputs to [`add_derived_metrics`] that are not stored in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DerivedConfig {
    /// Bytes per matrix element.
    pub element_bytes: u32,
    pub max_vector_registers: u32,
    /// Columns summed into the committed FMA count. Absent columns count
    /// as zero.
    pub fma_columns: Vec<String>,
    pub cycle_column: String,
}

impl Default for DerivedConfig {
    fn default() -> Self {
        Self {
            element_bytes: 8,
            max_vector_registers: gemsweep_core::DEFAULT_MAX_VECTOR_REGISTERS,
            fma_columns: DEFAULT_FMA_COLUMNS.iter().map(|s| s.to_string()).collect(),
            cycle_column: DEFAULT_CYCLE_COLUMN.to_string(),
        }
    }
}

impl DerivedConfig {
    /// The configured cycle column, or the last column whose name
    /// mentions `numCycles` when the configured one is absent.
    pub fn resolve_cycle_column(&self, table: &Table) -> Result<String> {
        resolve_cycle_column(table, &self.cycle_column)
    }
}

/// `configured` if `table` has it, otherwise the last `numCycles` column.
pub fn resolve_cycle_column(table: &Table, configured: &str) -> Result<String> {
    if table.has_column(configured) {
        return Ok(configured.to_string());
    }
    match table.column_names().filter(|n| n.contains("numCycles")).last() {
        Some(name) => {
            debug!(configured, using = name, "cycle column fallback");
            Ok(name.to_string())
        }
        None => Err(AnalysisError::MissingColumn {
            name: configured.to_string(),
        }),
    }
}

/// Append `k_c`, `unroll`, `minCyclesPossible`, `efficiency`, `bytesRead`,
/// `bytesWritten` and `l1bw` to `table`.
///
/// Tables that already carry `efficiency` are left untouched, so
/// re-deriving an extracted file is a no-op. Existing `k_c`/`unroll`
/// columns are used as-is instead of being recomputed.
pub fn add_derived_metrics(table: &mut Table, config: &DerivedConfig) -> Result<()> {
    if table.has_column(EFFICIENCY_COLUMN) {
        debug!("table already has derived metrics");
        return Ok(());
    }
    let rows = table.row_count();

    let mr = numeric_column(table, Field::Mr.name())?;
    let nr = numeric_column(table, Field::Nr.name())?;
    let simd_width = numeric_column(table, Field::SimdWidth.name())?;
    let simd_count = numeric_column(table, Field::SimdCount.name())?;
    let cycle_column = config.resolve_cycle_column(table)?;
    let cycles = numeric_column(table, &cycle_column)?;

    let mut fma = vec![0.0; rows];
    for name in &config.fma_columns {
        if !table.has_column(name) {
            warn!(column = %name, "FMA count column absent, counting as zero");
            continue;
        }
        for (sum, v) in fma.iter_mut().zip(numeric_column(table, name)?) {
            *sum += v;
        }
    }

    let carried = table.has_column(K_C_COLUMN) && table.has_column(UNROLL_COLUMN);
    let blocking = if carried {
        numeric_column(table, K_C_COLUMN)?
            .into_iter()
            .zip(numeric_column(table, UNROLL_COLUMN)?)
            .enumerate()
            .map(|(row, (k_c, unroll))| {
                Ok(Blocking {
                    k_c: parameter(k_c, K_C_COLUMN, row)?,
                    unroll: parameter(unroll, UNROLL_COLUMN, row)?,
                })
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        recompute_blocking(table, config, &mr, &nr, &simd_width)?
    };

    let mut min_cycles = Vec::with_capacity(rows);
    let mut efficiency = Vec::with_capacity(rows);
    let mut bytes_read = Vec::with_capacity(rows);
    let mut bytes_written = Vec::with_capacity(rows);
    let mut l1bw = Vec::with_capacity(rows);
    let eb = f64::from(config.element_bytes);

    for row in 0..rows {
        if simd_count[row] == 0.0 {
            return Err(AnalysisError::DivisionByZero {
                column: Field::SimdCount.name().to_string(),
                row,
            });
        }
        if cycles[row] == 0.0 {
            return Err(AnalysisError::DivisionByZero {
                column: cycle_column,
                row,
            });
        }
        let k_c = f64::from(blocking[row].k_c);
        let vector_bytes = simd_width[row] / 8.0;
        let minimum = fma[row] / simd_count[row];
        let read = mr[row] * k_c * vector_bytes + k_c * nr[row] * eb + mr[row] * nr[row] * vector_bytes;
        let written = mr[row] * nr[row] * vector_bytes;

        min_cycles.push(Value::Float(minimum));
        efficiency.push(Value::Float(minimum / cycles[row]));
        bytes_read.push(Value::Float(read));
        bytes_written.push(Value::Float(written));
        l1bw.push(Value::Float((read + written) / cycles[row]));
    }

    if !carried {
        table.add_column(K_C_COLUMN, blocking.iter().map(|b| Value::from(b.k_c)).collect())?;
        table.add_column(UNROLL_COLUMN, blocking.iter().map(|b| Value::from(b.unroll)).collect())?;
    }
    table.add_column(MIN_CYCLES_COLUMN, min_cycles)?;
    table.add_column(EFFICIENCY_COLUMN, efficiency)?;
    table.add_column(BYTES_READ_COLUMN, bytes_read)?;
    table.add_column(BYTES_WRITTEN_COLUMN, bytes_written)?;
    table.add_column(L1_BANDWIDTH_COLUMN, l1bw)?;
    debug!(rows, carried, "derived metrics added");
    Ok(())
}

type CacheKey = (u32, u32, u32, u32, u64, u32);

fn recompute_blocking(
    table: &Table,
    config: &DerivedConfig,
    mr: &[f64],
    nr: &[f64],
    simd_width: &[f64],
) -> Result<Vec<Blocking>> {
    let defaults = ParameterDomains::with_defaults(gemsweep_core::Isa::Aarch64);
    // Older tables may predate the cache geometry columns.
    let geometry = |field: Field| -> Result<Vec<f64>> {
        if table.has_column(field.name()) {
            numeric_column(table, field.name())
        } else {
            let fallback = defaults.values(field).first().copied().unwrap_or_default();
            debug!(column = field.name(), fallback, "parameter column absent, using default");
            Ok(vec![f64::from(fallback); table.row_count()])
        }
    };
    let assoc = geometry(Field::Assoc)?;
    let l1_size = geometry(Field::L1Size)?;
    let cl_size = geometry(Field::ClSize)?;

    let mut cache: HashMap<CacheKey, Blocking> = HashMap::new();
    let mut out = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let key = (
            parameter(mr[row], Field::Mr.name(), row)?,
            parameter(nr[row], Field::Nr.name(), row)?,
            parameter(simd_width[row], Field::SimdWidth.name(), row)?,
            parameter(assoc[row], Field::Assoc.name(), row)?,
            u64::from(parameter(l1_size[row], Field::L1Size.name(), row)?) * 1024,
            parameter(cl_size[row], Field::ClSize.name(), row)?,
        );
        let blocking = match cache.get(&key) {
            Some(b) => *b,
            None => {
                let b = compute_blocking(&BlockingParams {
                    mr: key.0,
                    nr: key.1,
                    simd_width: key.2,
                    element_bytes: config.element_bytes,
                    cache_assoc: key.3,
                    cache_size_bytes: key.4,
                    line_size_bytes: key.5,
                    max_vector_registers: config.max_vector_registers,
                })?;
                cache.insert(key, b);
                b
            }
        };
        out.push(blocking);
    }
    Ok(out)
}
