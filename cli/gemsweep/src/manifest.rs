//! `gemsweep.toml` parsing and sweep configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gemsweep_core::{Field, Isa, ParameterDomains, ResourceBudget, DEFAULT_MAX_VECTOR_REGISTERS, DEFAULT_MAX_WORKERS};
use gemsweep_dispatch::{AddressSpaceLimit, HostResources};
use gemsweep_sim::SimulatorSettings;
use gemsweep_table::TableFormat;

pub const MANIFEST_NAME: &str = "gemsweep.toml";

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// The top-level configuration of a sweep project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SweepManifest {
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[sweep]`: the swept domains and kernel constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SweepConfig {
    #[serde(default = "default_isa")]
    pub isa: String,
    #[serde(default = "default_max_vector_registers")]
    pub max_vector_registers: u32,
    #[serde(default = "default_element_bytes")]
    pub element_bytes: u32,
    /// Field name to candidate values, e.g. `mr = [2, 4]`.
    #[serde(flatten)]
    pub domains: BTreeMap<String, Vec<u32>>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            isa: default_isa(),
            max_vector_registers: default_max_vector_registers(),
            element_bytes: default_element_bytes(),
            domains: BTreeMap::new(),
        }
    }
}

fn default_isa() -> String {
    Isa::Aarch64.name().to_string()
}

fn default_max_vector_registers() -> u32 {
    DEFAULT_MAX_VECTOR_REGISTERS
}

fn default_element_bytes() -> u32 {
    8
}

/// `[simulator]`: how to launch the external simulator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SimulatorConfig {
    #[serde(default)]
    pub command: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub binary_dir: Option<PathBuf>,
    #[serde(default)]
    pub quiet: bool,
}

/// `[resources]`: worker sizing and memory limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResourcesConfig {
    pub worker_ram_bytes: u64,
    pub bytes_per_combination: u64,
    pub ram_fraction: f64,
    pub max_workers: usize,
    pub worker_soft_limit_bytes: u64,
    pub worker_hard_limit_bytes: u64,
    /// Fractions of physical memory the dispatcher itself may map.
    pub parent_soft_fraction: f64,
    pub parent_hard_fraction: f64,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            worker_ram_bytes: 800 * MIB,
            bytes_per_combination: 512 * KIB,
            ram_fraction: 0.5,
            max_workers: DEFAULT_MAX_WORKERS,
            worker_soft_limit_bytes: AddressSpaceLimit::WORKER_DEFAULT.soft_bytes,
            worker_hard_limit_bytes: AddressSpaceLimit::WORKER_DEFAULT.hard_bytes,
            parent_soft_fraction: 0.75,
            parent_hard_fraction: 0.9,
        }
    }
}

impl ResourcesConfig {
    pub fn budget(&self, host: &HostResources) -> ResourceBudget {
        ResourceBudget {
            hardware_cores: host.cores,
            total_ram_bytes: host.total_ram_bytes,
            ram_fraction: self.ram_fraction,
            worker_base_bytes: self.worker_ram_bytes,
            bytes_per_combination: self.bytes_per_combination,
            max_workers: self.max_workers,
        }
    }

    pub fn worker_limit(&self) -> AddressSpaceLimit {
        AddressSpaceLimit {
            soft_bytes: self.worker_soft_limit_bytes,
            hard_bytes: self.worker_hard_limit_bytes,
        }
    }

    pub fn parent_limit(&self, host: &HostResources) -> AddressSpaceLimit {
        AddressSpaceLimit::fraction_of(host.total_ram_bytes, self.parent_soft_fraction, self.parent_hard_fraction)
    }
}

/// `[output]`: where merged results go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub stem: String,
    pub format: TableFormat,
    pub split_bytes: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            stem: "stats".to_string(),
            format: TableFormat::Gst,
            split_bytes: 4 * GIB,
        }
    }
}

impl SweepManifest {
    /// Search upward from `start_dir` for a `gemsweep.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_NAME);
            if candidate.is_file() {
                let manifest = Self::load(&candidate)?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing gemsweep.toml")
    }

    /// Domains from `[sweep]` on top of the built-in defaults.
    pub fn domains(&self) -> Result<ParameterDomains> {
        let isa = Isa::parse(&self.sweep.isa)?;
        let mut domains = ParameterDomains::with_defaults(isa);
        for (name, values) in &self.sweep.domains {
            let field = Field::parse(&name.replace('-', "_"))
                .with_context(|| format!("in [sweep] of {MANIFEST_NAME}"))?;
            domains.set(field, values.clone())?;
        }
        Ok(domains)
    }

    /// Simulator settings. The command and binary directory have no
    /// defaults and must come from the manifest or the command line.
    pub fn simulator_settings(&self) -> Result<SimulatorSettings> {
        let command = self
            .simulator
            .command
            .clone()
            .context("no simulator command (set [simulator] command or pass --simulator)")?;
        let binary_dir = self
            .simulator
            .binary_dir
            .clone()
            .context("no benchmark binary directory (set [simulator] binary-dir or pass --binary-dir)")?;
        Ok(SimulatorSettings {
            command,
            args: self.simulator.args.clone(),
            binary_dir,
            quiet: self.simulator.quiet,
            element_bytes: self.sweep.element_bytes,
            max_vector_registers: self.sweep.max_vector_registers,
        })
    }

    /// A starting `gemsweep.toml`.
    pub fn template() -> String {
        r#"[sweep]
isa = "aarch64"
mr = [1, 2, 4]
nr = [2, 4, 8]
simd_width = [128, 256]

[simulator]
command = "gem5.opt"
binary-dir = "binaries"

[output]
dir = "results"
format = "gst"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let manifest = SweepManifest::from_str(
            r#"
[sweep]
isa = "riscv64"
max-vector-registers = 32
element-bytes = 4
mr = [2, 4]
rob_size = [64, 128, 256]
fetch-buf-size = [32]

[simulator]
command = "/opt/gem5/gem5.opt"
args = ["--quiet"]
binary-dir = "bin"
quiet = true

[resources]
worker-ram-bytes = 1073741824
max-workers = 16
parent-soft-fraction = 0.5

[output]
dir = "out"
stem = "run"
format = "csv"
split-bytes = 1000
"#,
        )
        .unwrap();

        let domains = manifest.domains().unwrap();
        assert_eq!(domains.isa, Isa::Riscv64);
        assert_eq!(domains.values(Field::Mr), &[2, 4]);
        assert_eq!(domains.values(Field::RobSize), &[64, 128, 256]);
        assert_eq!(domains.values(Field::FetchBufSize), &[32]);
        assert_eq!(domains.values(Field::Nr), &[4]);

        let settings = manifest.simulator_settings().unwrap();
        assert_eq!(settings.command, PathBuf::from("/opt/gem5/gem5.opt"));
        assert_eq!(settings.element_bytes, 4);
        assert!(settings.quiet);

        assert_eq!(manifest.resources.max_workers, 16);
        assert_eq!(manifest.resources.ram_fraction, 0.5);
        assert_eq!(manifest.resources.parent_soft_fraction, 0.5);
        assert_eq!(manifest.resources.parent_hard_fraction, 0.9);
        assert_eq!(manifest.output.format, TableFormat::Csv);
        assert_eq!(manifest.output.split_bytes, 1000);
    }

    #[test]
    fn defaults_without_manifest() {
        let manifest = SweepManifest::default();
        assert_eq!(manifest.domains().unwrap().total_combinations(), 1);
        assert_eq!(manifest.output.stem, "stats");
        assert_eq!(manifest.output.split_bytes, 4 * GIB);
        assert_eq!(manifest.resources.worker_ram_bytes, 800 * MIB);
        assert!(manifest.simulator_settings().is_err());
    }

    #[test]
    fn rejects_unknown_fields_and_isas() {
        let unknown = SweepManifest::from_str("[sweep]\nwarp_size = [32]\n").unwrap();
        assert!(unknown.domains().is_err());
        let isa = SweepManifest::from_str("[sweep]\nisa = \"x86\"\n").unwrap();
        assert!(isa.domains().is_err());
        let empty = SweepManifest::from_str("[sweep]\nmr = []\n").unwrap();
        assert!(empty.domains().is_err());
    }

    #[test]
    fn template_is_valid_toml() {
        let manifest = SweepManifest::from_str(&SweepManifest::template()).unwrap();
        assert_eq!(manifest.domains().unwrap().len(Field::Nr), 3);
        assert!(manifest.simulator_settings().is_ok());
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_NAME), "[sweep]\nmr = [1]\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found) = SweepManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(found, dir.path());
        assert_eq!(manifest.domains().unwrap().values(Field::Mr), &[1]);
    }

    #[test]
    fn limits_and_budget() {
        let resources = ResourcesConfig::default();
        let host = HostResources {
            cores: 8,
            total_ram_bytes: 64 * GIB,
        };
        let budget = resources.budget(&host);
        assert_eq!(budget.hardware_cores, 8);
        assert_eq!(resources.worker_limit(), AddressSpaceLimit::WORKER_DEFAULT);
        let parent = resources.parent_limit(&host);
        assert_eq!(parent.hard_bytes, (64.0 * 0.9 * GIB as f64) as u64);
        assert!(parent.soft_bytes < parent.hard_bytes);
    }
}
