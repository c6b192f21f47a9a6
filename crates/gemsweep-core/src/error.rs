//! Error types for parameter space and tiling operations.

use crate::param::Field;

/// Errors raised while building or partitioning a parameter space.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested instruction set has no simulator configuration.
    #[error("unsupported ISA '{name}' (expected one of: aarch64, riscv64)")]
    UnsupportedIsa {
        /// The ISA name as given.
        name: String,
    },

    /// A field name did not match any sweepable parameter.
    #[error("unknown parameter field '{name}'")]
    UnknownField {
        /// The unrecognized field name.
        name: String,
    },

    /// A parameter domain was declared without any values.
    #[error("domain for '{field}' is empty")]
    EmptyDomain {
        /// The field with no values.
        field: Field,
    },

    /// The register blocking model is undefined for these inputs.
    #[error("blocking undefined for mr={mr}, nr={nr}, simd_width={simd_width}: {reason}")]
    UndefinedBlocking {
        mr: u32,
        nr: u32,
        simd_width: u32,
        /// Which term of the model degenerated.
        reason: String,
    },

    /// A point violates the vector register feasibility rule.
    #[error("kernel {mr}x{nr} needs {needed} vector registers, only {available} available")]
    Infeasible {
        mr: u32,
        nr: u32,
        needed: u32,
        available: u32,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
