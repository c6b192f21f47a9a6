//! Error types for sweep dispatch.

use std::io;

use gemsweep_sim::SimError;
use gemsweep_table::TableError;

/// Errors raised while dispatching chunks or collecting their results.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("worker for chunk {chunk} exited with {status}")]
    WorkerFailed { chunk: usize, status: String },

    #[error("worker panicked: {message}")]
    Panicked { message: String },

    #[error("sweep cancelled")]
    Cancelled,

    #[error("cannot apply resource limit: {detail}")]
    ResourceLimit { detail: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
