//! Running one chunk, in-process or as a worker process.

use std::io::{Read, Write};

use tracing::{debug, info};

use gemsweep_sim::{PointRunner, ProcessLauncher, SimulationRunner, SimulatorSettings};
use gemsweep_table::{PartialTable, RunRecord};

use crate::cancel::CancellationToken;
use crate::chunk::{Chunk, WorkOrder};
use crate::error::{DispatchError, Result};

/// Run every point of `chunk` and tabulate the records. Any failing point
/// fails the whole chunk.
pub fn execute_chunk(
    chunk: &Chunk,
    runner: &dyn PointRunner,
    token: &CancellationToken,
) -> Result<PartialTable> {
    let mut records: Vec<RunRecord> = Vec::new();
    for (n, point) in chunk.points().enumerate() {
        if token.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        debug!(chunk = chunk.index(), n, %point, "simulating point");
        records.extend(runner.run_point(&point)?);
    }
    info!(
        chunk = chunk.index(),
        outer = %chunk.label(),
        rows = records.len(),
        "chunk complete"
    );
    Ok(PartialTable::from_records(&records))
}

/// Serve one work order: read it from `input`, apply its memory limit,
/// simulate with runners from `make_runner` and write the partial table
/// as JSON to `output`.
pub fn serve_with<R, W, F>(input: R, mut output: W, make_runner: F) -> Result<()>
where
    R: Read,
    W: Write,
    F: FnOnce(&SimulatorSettings) -> Box<dyn PointRunner>,
{
    let order: WorkOrder =
        serde_json::from_reader(input).map_err(|e| DispatchError::Serialization(e.to_string()))?;
    if let Some(limit) = order.limit {
        limit.apply()?;
    }
    let runner = make_runner(&order.simulator);
    let table = execute_chunk(&order.chunk, runner.as_ref(), &CancellationToken::never())?;
    serde_json::to_writer(&mut output, &table).map_err(|e| DispatchError::Serialization(e.to_string()))?;
    output.flush()?;
    Ok(())
}

/// [`serve_with`] using the external simulator from the work order.
/// SIGINT is ignored from here on, also by the simulators it launches.
pub fn serve<R: Read, W: Write>(input: R, output: W) -> Result<()> {
    crate::cancel::ignore_interrupts();
    serve_with(input, output, |settings| {
        Box::new(SimulationRunner::new(
            ProcessLauncher::new(settings.clone()),
            settings.clone(),
        ))
    })
}
