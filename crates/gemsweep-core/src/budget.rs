//! Worker budget derived from host cores and memory.

use serde::{Deserialize, Serialize};

/// Hard ceiling on concurrent simulator processes.
pub const DEFAULT_MAX_WORKERS: usize = 128;

/// Host capacity and per-worker costs used to size the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceBudget {
    /// Logical cores available to the sweep.
    pub hardware_cores: usize,
    /// Physical memory of the host in bytes.
    pub total_ram_bytes: u64,
    /// Share of `total_ram_bytes` the workers may occupy together.
    pub ram_fraction: f64,
    /// Fixed resident size of one simulator worker.
    pub worker_base_bytes: u64,
    /// Extra resident size per inner-grid point a worker accumulates.
    pub bytes_per_combination: u64,
    pub max_workers: usize,
}

impl ResourceBudget {
    /// Workers that fit in memory when each carries `inner_count` points.
    /// Never less than one.
    pub fn memory_cap(&self, inner_count: u64) -> usize {
        let per_worker = self
            .worker_base_bytes
            .saturating_add(self.bytes_per_combination.saturating_mul(inner_count))
            .max(1);
        let usable = self.total_ram_bytes as f64 * self.ram_fraction;
        ((usable / per_worker as f64).floor() as usize).max(1)
    }

    /// `min(cores, memory cap, max_workers)`, at least one.
    pub fn worker_budget(&self, inner_count: u64) -> usize {
        self.hardware_cores
            .min(self.memory_cap(inner_count))
            .min(self.max_workers)
            .max(1)
    }
}
