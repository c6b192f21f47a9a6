//! Work chunks and the work order shipped to worker processes.

use serde::{Deserialize, Serialize};

use gemsweep_core::grid::expand;
use gemsweep_core::{Field, Isa, OuterPoint, ParameterGrid, ParameterPoint};
use gemsweep_sim::SimulatorSettings;

use crate::host::AddressSpaceLimit;

/// One outer-grid combination and the inner grid it walks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub isa: Isa,
    pub outer: OuterPoint,
    pub inner: Vec<(Field, Vec<u32>)>,
}

impl Chunk {
    pub fn index(&self) -> usize {
        self.outer.index
    }

    /// Points of this chunk in inner lexicographic order.
    pub fn points(&self) -> impl Iterator<Item = ParameterPoint> + '_ {
        expand(self.isa, &self.outer, &self.inner)
    }

    pub fn point_count(&self) -> u64 {
        self.inner.iter().map(|(_, v)| v.len() as u64).product()
    }

    /// Short label such as `mr=2 nr=4 rob_size=128`.
    pub fn label(&self) -> String {
        self.outer
            .values
            .iter()
            .map(|(f, v)| format!("{f}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One chunk per feasible outer point, in outer order.
pub fn chunks(grid: &ParameterGrid) -> Vec<Chunk> {
    grid.outer_points
        .iter()
        .map(|outer| Chunk {
            isa: grid.isa,
            outer: outer.clone(),
            inner: grid.inner.clone(),
        })
        .collect()
}

/// Everything a worker process needs, read as JSON from its stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub chunk: Chunk,
    pub simulator: SimulatorSettings,
    #[serde(default)]
    pub limit: Option<AddressSpaceLimit>,
}
