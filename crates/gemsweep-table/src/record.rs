//! One row of simulation output.

use serde::{Deserialize, Serialize};

use gemsweep_core::{Field, ParameterPoint};

use crate::table::{PartialTable, Table};
use crate::value::Value;

/// Column holding the ISA name.
pub const ISA_COLUMN: &str = "isa";
/// Column holding the zero-based measured phase index.
pub const RUN_COLUMN: &str = "run";

/// Statistics captured for one measured phase of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub point: ParameterPoint,
    pub run: u32,
    /// Flattened statistic names and values, in the order the simulator
    /// reported them.
    pub stats: Vec<(String, f64)>,
}

impl RunRecord {
    pub fn new(point: ParameterPoint, run: u32, stats: Vec<(String, f64)>) -> Self {
        Self { point, run, stats }
    }

    /// Cells in column order: parameters, ISA, run index, statistics.
    pub fn cells(&self) -> Vec<(String, Value)> {
        let mut cells = Vec::with_capacity(Field::ALL.len() + 2 + self.stats.len());
        cells.extend(
            self.point
                .pairs()
                .map(|(f, v)| (f.name().to_string(), Value::from(v))),
        );
        cells.push((ISA_COLUMN.to_string(), Value::from(self.point.isa.name())));
        cells.push((RUN_COLUMN.to_string(), Value::from(self.run)));
        cells.extend(self.stats.iter().map(|(k, v)| (k.clone(), Value::Float(*v))));
        cells
    }

    /// Stat lookup by exact name.
    pub fn stat(&self, name: &str) -> Option<f64> {
        self.stats.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
    }
}

/// Column names that identify a configuration rather than a measurement.
pub fn index_columns() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Field::ALL.iter().map(|f| f.name()).collect();
    names.push(ISA_COLUMN);
    names.push(RUN_COLUMN);
    names
}

impl PartialTable {
    /// Tabulate a worker's records. A statistic missing from some record
    /// reads as zero in that row.
    pub fn from_records(records: &[RunRecord]) -> PartialTable {
        let mut table = Table::new();
        for record in records {
            table.push_row(record.cells());
        }
        table.into()
    }
}
