//! Benchmark binary selection and iteration count.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use gemsweep_core::{compute_blocking, BlockingParams, Field, Isa, ParameterPoint};

use crate::config::SimulatorSettings;
use crate::error::Result;

/// The GEMM micro-benchmark a point runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub binary: PathBuf,
    /// Outer-loop iterations passed to the binary.
    pub iterations: u32,
    pub k_c: u32,
    pub unroll: u32,
}

impl Workload {
    /// Pick the binary for the point's kernel shape and size it from the
    /// blocking model.
    pub fn resolve(point: &ParameterPoint, settings: &SimulatorSettings) -> Result<Self> {
        let mr = point.get(Field::Mr);
        let nr = point.get(Field::Nr);
        let blocking = compute_blocking(&BlockingParams::for_point(
            point,
            settings.element_bytes,
            settings.max_vector_registers,
        ))?;
        Ok(Self {
            binary: binary_path(&settings.binary_dir, point.isa, mr, nr),
            iterations: blocking.iterations(),
            k_c: blocking.k_c,
            unroll: blocking.unroll,
        })
    }
}

/// File name of the pre-built kernel benchmark.
pub fn binary_name(isa: Isa, mr: u32, nr: u32) -> String {
    match isa {
        Isa::Aarch64 => format!("gemmbench_{mr}_{nr}_avecpreload_bvecdist1_boff"),
        Isa::Riscv64 => format!("gemmbench_{mr}_{nr}_avecpreload_bvecfmavf"),
    }
}

/// `<binary_dir>/<isa>/<binary_name>`.
pub fn binary_path(binary_dir: &Path, isa: Isa, mr: u32, nr: u32) -> PathBuf {
    binary_dir.join(isa.name()).join(binary_name(isa, mr, nr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_names_per_isa() {
        assert_eq!(binary_name(Isa::Aarch64, 4, 4), "gemmbench_4_4_avecpreload_bvecdist1_boff");
        assert_eq!(binary_name(Isa::Riscv64, 2, 8), "gemmbench_2_8_avecpreload_bvecfmavf");
        assert_eq!(
            binary_path(Path::new("/opt/bench"), Isa::Riscv64, 1, 2),
            PathBuf::from("/opt/bench/riscv64/gemmbench_1_2_avecpreload_bvecfmavf")
        );
    }

    #[test]
    fn iterations_follow_blocking() {
        let point = ParameterPoint::from_pairs(
            Isa::Aarch64,
            [
                (Field::Mr, 4),
                (Field::Nr, 4),
                (Field::SimdWidth, 128),
                (Field::Assoc, 8),
                (Field::L1Size, 64),
                (Field::ClSize, 64),
            ],
        );
        let settings = SimulatorSettings {
            command: PathBuf::from("sim"),
            args: vec![],
            binary_dir: PathBuf::from("bin"),
            quiet: false,
            element_bytes: 8,
            max_vector_registers: 32,
        };
        let w = Workload::resolve(&point, &settings).unwrap();
        assert_eq!(w.k_c, 512);
        assert_eq!(w.unroll, 4);
        assert_eq!(w.iterations, 128);
        assert!(w.binary.ends_with("aarch64/gemmbench_4_4_avecpreload_bvecdist1_boff"));
    }
}
