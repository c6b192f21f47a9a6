//! Error types for driving the simulator.

use std::io;
use std::path::PathBuf;

use gemsweep_core::CoreError;

/// Errors raised while configuring or running one simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("workload binary not found: {}", path.display())]
    MissingBinary { path: PathBuf },

    #[error("failed to start simulator '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed simulator event: {detail}")]
    Protocol { detail: String },

    #[error("simulator exited with {status}")]
    SimulatorFailed { status: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for simulator operations.
pub type Result<T> = std::result::Result<T, SimError>;
