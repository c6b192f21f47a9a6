//! Simulator adapter for gemsweep.
//!
//! Turns a [`gemsweep_core::ParameterPoint`] into a simulator
//! configuration and a workload, drives the simulator through its
//! `workbegin`/`workend` phases and flattens the statistics of each
//! measured phase into a [`gemsweep_table::RunRecord`].

pub mod config;
pub mod error;
pub mod external;
pub mod runner;
pub mod stats;
pub mod workload;

pub use config::{SimulatorConfig, SimulatorSettings};
pub use error::{Result, SimError};
pub use external::{ProcessLauncher, ProcessSimulator};
pub use runner::{run_phases, ExitEvent, Launcher, PointRunner, SimulationRunner, Simulator, CYCLES_STAT};
pub use stats::{Distribution, Stat, StatGroup, StatKind, StatTree};
pub use workload::{binary_name, binary_path, Workload};
