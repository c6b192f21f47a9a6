//! Analytical register/cache blocking model for the GEMM micro-kernel.
//!
//! Given the kernel shape and the L1 geometry, the model picks the depth
//! `k_c` of the packed panels so that one `mr_elem x k_c` slice of A stays
//! resident in the ways of L1 not claimed by B, and an unroll factor for
//! the inner loop derived from the vector registers left over for B.
//!
//! The arithmetic is carried out in `f64` and truncated exactly where the
//! kernel generator truncates, so `k_c` matches the values baked into the
//! benchmark binaries.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::param::{Field, ParameterPoint};

/// Inputs to the blocking model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingParams {
    /// Kernel rows, in vector registers.
    pub mr: u32,
    /// Kernel columns, in scalar elements.
    pub nr: u32,
    /// Vector width in bits.
    pub simd_width: u32,
    /// Element size in bytes (8 for double precision).
    pub element_bytes: u32,
    pub cache_assoc: u32,
    pub cache_size_bytes: u64,
    pub line_size_bytes: u32,
    /// Architectural vector register count.
    pub max_vector_registers: u32,
}

impl BlockingParams {
    /// Blocking inputs for a sweep point. `l1_size` is stored in KiB.
    pub fn for_point(point: &ParameterPoint, element_bytes: u32, max_vector_registers: u32) -> Self {
        Self {
            mr: point.get(Field::Mr),
            nr: point.get(Field::Nr),
            simd_width: point.get(Field::SimdWidth),
            element_bytes,
            cache_assoc: point.get(Field::Assoc),
            cache_size_bytes: u64::from(point.get(Field::L1Size)) * 1024,
            line_size_bytes: point.get(Field::ClSize),
            max_vector_registers,
        }
    }

    /// Kernel rows expressed in scalar elements.
    pub fn mr_elements(&self) -> f64 {
        f64::from(self.mr) * f64::from(self.simd_width) / (f64::from(self.element_bytes) * 8.0)
    }
}

/// Output of the blocking model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocking {
    /// Depth of the packed panels, a multiple of `unroll`.
    pub k_c: u32,
    /// Inner loop unroll factor.
    pub unroll: u32,
}

impl Blocking {
    /// Outer-loop iteration count handed to the benchmark binary.
    pub fn iterations(&self) -> u32 {
        (self.k_c / self.unroll).max(2)
    }
}

/// Compute `(k_c, unroll)` for a kernel/cache configuration.
pub fn compute_blocking(params: &BlockingParams) -> Result<Blocking> {
    let undefined = |reason: &str| CoreError::UndefinedBlocking {
        mr: params.mr,
        nr: params.nr,
        simd_width: params.simd_width,
        reason: reason.to_string(),
    };

    let mr_elem = params.mr_elements();
    if !(mr_elem > 0.0) {
        return Err(undefined("kernel has no rows"));
    }
    if params.nr == 0 {
        return Err(undefined("kernel has no columns"));
    }
    if params.cache_assoc == 0 || params.line_size_bytes == 0 {
        return Err(undefined("cache geometry is empty"));
    }

    let used = params.mr * params.nr + 2 * params.mr;
    if used >= params.max_vector_registers {
        return Err(undefined("no vector registers left for B"));
    }
    let b_regs = params.max_vector_registers - used;

    let nr = f64::from(params.nr);
    let assoc = f64::from(params.cache_assoc);
    let ways_for_a = ((assoc - 1.0) / (1.0 + nr / mr_elem)).floor().max(1.0);
    let lines_per_way = params.cache_size_bytes as f64 / assoc / f64::from(params.line_size_bytes);
    let k_c_raw = (ways_for_a * lines_per_way * f64::from(params.line_size_bytes)
        / (mr_elem * f64::from(params.element_bytes)))
    .trunc() as u32;

    let unroll = snap_unroll(unroll_factor(b_regs, params.nr));
    let k_c = k_c_raw / unroll * unroll;
    Ok(Blocking { k_c, unroll })
}

/// Raw unroll factor: `lcm(b_regs, nr) / nr`.
pub fn unroll_factor(b_regs: u32, nr: u32) -> u32 {
    lcm(b_regs, nr) / nr
}

/// Snap small unroll factors up to what the kernel generator emits.
pub fn snap_unroll(raw: u32) -> u32 {
    match raw {
        0..=2 => 4,
        4 => 8,
        6 => 12,
        other => other,
    }
}

/// Vector registers needed by an `mr x nr` kernel: the accumulators, two
/// A buffers per row and one B broadcast.
pub fn registers_needed(mr: u32, nr: u32) -> u32 {
    mr * nr + 2 * mr + 1
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn lcm(a: u32, b: u32) -> u32 {
    if a == 0 || b == 0 {
        return 0;
    }
    a / gcd(a, b) * b
}
