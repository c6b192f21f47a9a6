//! Core model for gemsweep parameter sweeps.
//!
//! - [`param`]: the sixteen sweepable microarchitectural fields, ISA and points
//! - [`tiling`]: analytical `k_c`/unroll blocking model for the GEMM kernel
//! - [`space`]: lexicographic enumeration filtered by register feasibility
//! - [`budget`]: worker budget from host cores and memory
//! - [`grid`]: outer/inner partition of the sweep into work chunks

pub mod budget;
pub mod error;
pub mod grid;
pub mod param;
pub mod space;
pub mod tiling;

pub use budget::{ResourceBudget, DEFAULT_MAX_WORKERS};
pub use error::{CoreError, Result};
pub use grid::{OuterPoint, ParameterGrid};
pub use param::{Field, Isa, ParameterDomains, ParameterPoint};
pub use space::{enumerate, Feasibility, ParameterSpace, Product, DEFAULT_MAX_VECTOR_REGISTERS};
pub use tiling::{compute_blocking, Blocking, BlockingParams};
