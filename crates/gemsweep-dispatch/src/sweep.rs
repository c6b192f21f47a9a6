//! Sweep orchestration: plan the grid, dispatch chunks, collect results.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use gemsweep_core::{OuterPoint, ParameterGrid, ParameterSpace, ResourceBudget};

use crate::cancel::CancellationToken;
use crate::chunk::{chunks, Chunk};
use crate::error::{DispatchError, Result};
use crate::executor::ChunkExecutor;
use crate::pool::dispatch;
use crate::sink::ResultSink;

/// The partitioned sweep, ready to dispatch.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub grid: ParameterGrid,
    pub chunks: Vec<Chunk>,
}

impl SweepPlan {
    pub fn new(space: &ParameterSpace, budget: &ResourceBudget) -> Self {
        let grid = ParameterGrid::partition(space, budget);
        let chunks = chunks(&grid);
        info!(
            outer = ?grid.outer_fields,
            chunks = chunks.len(),
            points_per_chunk = grid.inner_count(),
            workers = grid.max_workers,
            "planned sweep"
        );
        Self { grid, chunks }
    }

    pub fn total_points(&self) -> u64 {
        self.chunks.len() as u64 * self.grid.inner_count()
    }

    pub fn max_workers(&self) -> usize {
        self.grid.max_workers
    }
}

/// An outer point whose chunk produced no results.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkFailure {
    pub outer: OuterPoint,
    pub reason: String,
}

/// What a finished (or interrupted) sweep did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub chunks_total: usize,
    pub chunks_completed: usize,
    pub rows: usize,
    pub failures: Vec<ChunkFailure>,
    pub cancelled: bool,
    pub outputs: Vec<PathBuf>,
}

/// Run every chunk of `plan` through `executor` and hand the partial
/// tables to `sink` in completion order. Failed chunks are logged and
/// recorded in the report; only sink errors abort the sweep.
pub fn run_sweep(
    plan: SweepPlan,
    executor: &dyn ChunkExecutor,
    sink: &mut dyn ResultSink,
    token: &CancellationToken,
) -> Result<SweepReport> {
    let started = Instant::now();
    let workers = plan.max_workers();
    let mut report = SweepReport {
        chunks_total: plan.chunks.len(),
        ..SweepReport::default()
    };

    dispatch(plan.chunks, executor, workers, token, |outcome| {
        match outcome.result {
            Ok(part) => {
                report.chunks_completed += 1;
                report.rows += part.rows;
                sink.accept(part)?;
                info!(
                    done = report.chunks_completed + report.failures.len(),
                    total = report.chunks_total,
                    elapsed_s = started.elapsed().as_secs(),
                    "progress"
                );
            }
            Err(DispatchError::Cancelled) => {}
            Err(e) => {
                let reason = e.to_string();
                warn!(outer = ?outcome.outer.values, %reason, "chunk failed, dropping its results");
                report.failures.push(ChunkFailure {
                    outer: outcome.outer,
                    reason,
                });
            }
        }
        Ok(())
    })?;

    report.cancelled = token.is_cancelled();
    report.outputs = sink.finish()?;
    if report.cancelled {
        warn!(
            completed = report.chunks_completed,
            total = report.chunks_total,
            "sweep interrupted, partial results kept"
        );
    } else {
        info!(
            completed = report.chunks_completed,
            failed = report.failures.len(),
            rows = report.rows,
            elapsed_s = started.elapsed().as_secs(),
            "sweep finished"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancellation_pair;
    use crate::executor::InProcessExecutor;
    use crate::sink::MemorySink;
    use gemsweep_core::{Feasibility, Field, Isa, ParameterDomains, ParameterPoint};
    use gemsweep_sim::PointRunner;
    use gemsweep_table::RunRecord;

    struct CountingRunner;

    impl PointRunner for CountingRunner {
        fn run_point(&self, point: &ParameterPoint) -> gemsweep_sim::Result<Vec<RunRecord>> {
            if point.get(Field::Mr) == 3 {
                return Err(gemsweep_sim::SimError::SimulatorFailed {
                    status: "signal: 9 (SIGKILL)".into(),
                });
            }
            Ok(vec![RunRecord::new(
                point.clone(),
                0,
                vec![("system.cpu.numCycles".into(), 100.0)],
            )])
        }
    }

    fn space() -> ParameterSpace {
        let mut d = ParameterDomains::with_defaults(Isa::Aarch64);
        d.set(Field::Mr, vec![1, 2, 3]).unwrap();
        d.set(Field::Nr, vec![2, 4]).unwrap();
        d.set(Field::IqSize, vec![32, 64]).unwrap();
        ParameterSpace::new(d, Feasibility::default())
    }

    fn budget() -> ResourceBudget {
        ResourceBudget {
            hardware_cores: 4,
            total_ram_bytes: 1 << 36,
            ram_fraction: 0.5,
            worker_base_bytes: 1 << 28,
            bytes_per_combination: 1 << 19,
            max_workers: 128,
        }
    }

    #[test]
    fn failed_chunks_are_dropped_and_reported() {
        let plan = SweepPlan::new(&space(), &budget());
        assert_eq!(plan.total_points(), 12);
        let mut sink = MemorySink::new();
        let report = run_sweep(
            plan,
            &InProcessExecutor::new(CountingRunner),
            &mut sink,
            &CancellationToken::never(),
        )
        .unwrap();

        assert_eq!(report.chunks_total, 6);
        assert_eq!(report.chunks_completed, 4);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| f.outer.get(Field::Mr) == Some(3)));
        assert!(!report.cancelled);

        let table = sink.into_table();
        assert_eq!(table.row_count(), 8);
        assert_eq!(report.rows, 8);
    }

    #[test]
    fn cancelled_sweep_reports_partial() {
        let (token, handle) = cancellation_pair();
        handle.cancel();
        let mut sink = MemorySink::new();
        let report = run_sweep(
            SweepPlan::new(&space(), &budget()),
            &InProcessExecutor::new(CountingRunner),
            &mut sink,
            &token,
        )
        .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.chunks_completed, 0);
        assert!(report.failures.is_empty());
    }
}
