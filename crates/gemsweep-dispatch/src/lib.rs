//! Parallel sweep execution for gemsweep.
//!
//! A [`SweepPlan`] splits the parameter space into [`Chunk`]s, one per
//! outer-grid point. [`run_sweep`] feeds them through a bounded pool of
//! [`ChunkExecutor`]s (normally one worker process per chunk) and merges
//! the resulting partial tables into a [`ResultSink`] in completion order.

pub mod cancel;
pub mod chunk;
pub mod error;
pub mod executor;
pub mod host;
pub mod pool;
pub mod sink;
pub mod sweep;
pub mod worker;

pub use cancel::{cancellation_pair, ignore_interrupts, CancellationHandle, CancellationToken};
pub use chunk::{chunks, Chunk, WorkOrder};
pub use error::{DispatchError, Result};
pub use executor::{ChunkExecutor, InProcessExecutor, ProcessExecutor};
pub use host::{AddressSpaceLimit, HostResources};
pub use pool::{dispatch, ChunkOutcome};
pub use sink::{MemorySink, ResultSink, RollingFileSink};
pub use sweep::{run_sweep, ChunkFailure, SweepPlan, SweepReport};
pub use worker::{execute_chunk, serve, serve_with};
