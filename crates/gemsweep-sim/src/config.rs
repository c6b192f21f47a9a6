//! Simulator configuration derived from a parameter point.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use gemsweep_core::{Feasibility, Field, Isa, ParameterPoint};

use crate::error::Result;
use crate::workload::Workload;

/// How to run the simulator and locate workloads. Shared by every point
/// of a sweep and shipped to worker processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorSettings {
    /// Simulator executable.
    pub command: PathBuf,
    /// Arguments placed before the generated ones.
    #[serde(default)]
    pub args: Vec<String>,
    /// Root of the benchmark binaries, one subdirectory per ISA.
    pub binary_dir: PathBuf,
    /// Discard the simulator's stderr.
    #[serde(default)]
    pub quiet: bool,
    pub element_bytes: u32,
    pub max_vector_registers: u32,
}

impl SimulatorSettings {
    pub fn feasibility(&self) -> Feasibility {
        Feasibility {
            max_vector_registers: self.max_vector_registers,
        }
    }
}

/// A functional unit override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalUnit {
    /// Operation class served by the unit, e.g. `SimdFloatMultAcc`.
    pub op_class: String,
    pub count: u32,
    /// Latency override in cycles, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<u32>,
}

/// Out-of-order core parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub decode_width: u32,
    pub fetch_width: u32,
    pub commit_width: u32,
    pub rob_entries: u32,
    pub iq_entries: u32,
    pub phys_vec_regs: u32,
    pub phys_float_regs: u32,
    pub fetch_buffer_bytes: u32,
    /// Vector length in bits.
    pub vector_length: u32,
    pub functional_units: Vec<FunctionalUnit>,
}

/// L1 data cache geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub l1d_size_bytes: u64,
    pub l1d_assoc: u32,
    pub line_size_bytes: u32,
}

/// Everything the simulator needs for one run, written as JSON and passed
/// with `--config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub isa: Isa,
    pub core: CoreConfig,
    pub cache: CacheConfig,
    pub workload: Workload,
}

impl SimulatorConfig {
    /// Build the configuration for `point`. Infeasible points are rejected.
    pub fn for_point(point: &ParameterPoint, settings: &SimulatorSettings) -> Result<Self> {
        settings.feasibility().check(point)?;
        let workload = Workload::resolve(point, settings)?;

        let simd_count = point.get(Field::SimdCount);
        let simd_lat = point.get(Field::SimdLat);
        let phregs = point.get(Field::SimdPhregCount);
        let core = CoreConfig {
            decode_width: point.get(Field::DecodeWidth),
            fetch_width: point.get(Field::DecodeWidth),
            commit_width: point.get(Field::CommitWidth),
            rob_entries: point.get(Field::RobSize),
            iq_entries: point.get(Field::IqSize),
            phys_vec_regs: phregs,
            phys_float_regs: phregs,
            fetch_buffer_bytes: point.get(Field::FetchBufSize),
            vector_length: point.get(Field::SimdWidth),
            functional_units: vec![
                FunctionalUnit {
                    op_class: "SimdFloatMultAcc".to_string(),
                    count: simd_count,
                    latency: Some(simd_lat),
                },
                FunctionalUnit {
                    op_class: "MemRead".to_string(),
                    count: point.get(Field::LdCount),
                    latency: None,
                },
                FunctionalUnit {
                    op_class: "MemWrite".to_string(),
                    count: point.get(Field::StCount),
                    latency: None,
                },
            ],
        };
        let cache = CacheConfig {
            l1d_size_bytes: u64::from(point.get(Field::L1Size)) * 1024,
            l1d_assoc: point.get(Field::Assoc),
            line_size_bytes: point.get(Field::ClSize),
        };

        Ok(Self {
            isa: point.isa,
            core,
            cache,
            workload,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::error::SimError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemsweep_core::ParameterDomains;

    fn settings() -> SimulatorSettings {
        SimulatorSettings {
            command: PathBuf::from("gem5"),
            args: vec![],
            binary_dir: PathBuf::from("bin"),
            quiet: true,
            element_bytes: 8,
            max_vector_registers: 32,
        }
    }

    fn default_point() -> ParameterPoint {
        gemsweep_core::enumerate(
            &ParameterDomains::with_defaults(Isa::Aarch64),
            Feasibility::default(),
        )
        .remove(0)
    }

    #[test]
    fn maps_point_onto_core() {
        let mut point = default_point();
        point.set(Field::RobSize, 192);
        point.set(Field::SimdLat, 3);
        let config = SimulatorConfig::for_point(&point, &settings()).unwrap();
        assert_eq!(config.core.rob_entries, 192);
        assert_eq!(config.core.fetch_width, config.core.decode_width);
        assert_eq!(config.core.functional_units[0].latency, Some(3));
        assert_eq!(config.cache.l1d_size_bytes, 64 * 1024);
        assert_eq!(config.workload.k_c, 765);
    }

    #[test]
    fn rejects_infeasible_kernels() {
        let mut point = default_point();
        point.set(Field::Mr, 4);
        point.set(Field::Nr, 8);
        assert!(SimulatorConfig::for_point(&point, &settings()).is_err());
    }

    #[test]
    fn json_mentions_workload() {
        let config = SimulatorConfig::for_point(&default_point(), &settings()).unwrap();
        let json = config.to_json().unwrap();
        assert!(json.contains("gemmbench_2_4_avecpreload_bvecdist1_boff"));
        assert!(json.contains("\"isa\": \"aarch64\""));
    }
}
