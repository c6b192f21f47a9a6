//! gemsweep CLI: sweep GEMM micro-kernels over simulated cores and analyze the results.

mod commands;
mod logging;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use gemsweep_core::{BlockingParams, Field, Isa};

use manifest::SweepManifest;

#[derive(Parser)]
#[command(name = "gemsweep", version, about = "GEMM micro-kernel design-space sweeps")]
struct Cli {
    /// Log filter (e.g. info, debug, gemsweep_dispatch=trace); overrides GEMSWEEP_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate every feasible parameter combination
    Sweep {
        /// Configuration file (default: gemsweep.toml searched upward)
        #[arg(long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        domains: DomainArgs,
        /// Target ISA (aarch64, riscv64)
        #[arg(long)]
        isa: Option<String>,
        /// Simulator executable
        #[arg(long)]
        simulator: Option<PathBuf>,
        /// Directory holding the per-ISA benchmark binaries
        #[arg(long)]
        binary_dir: Option<PathBuf>,
        /// Directory for result files
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Result file format (gst, csv, json)
        #[arg(long)]
        format: Option<String>,
        /// Start a new result file once this many bytes are buffered
        #[arg(long)]
        split_bytes: Option<u64>,
        /// Upper bound on concurrent workers
        #[arg(long)]
        max_workers: Option<usize>,
        /// Discard simulator stderr
        #[arg(long)]
        quiet: bool,
        /// Print the work partition and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one chunk read from stdin (used by `sweep`)
    #[command(hide = true)]
    Worker,
    /// Merge a directory of result files into one table
    Extract {
        /// Directory containing result files
        #[arg(long)]
        stat_dir: PathBuf,
        /// Keep rows where key=value
        #[arg(long, num_args = 1..)]
        select: Vec<String>,
        /// Columns to keep besides the parameters, or `all`
        #[arg(long, num_args = 1..)]
        targets: Vec<String>,
        /// Output file; the extension selects the format
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the available column names and exit
        #[arg(long)]
        list_stats: bool,
        /// Files processed concurrently
        #[arg(long)]
        max_workers: Option<usize>,
    },
    /// Best row per group
    Best {
        /// Result file or directory
        #[arg(long)]
        input: PathBuf,
        /// Grouping columns
        #[arg(long, num_args = 1.., required = true)]
        group_by: Vec<String>,
        /// Column to maximize
        #[arg(long, default_value = "efficiency")]
        metric: String,
        #[arg(long, num_args = 1..)]
        select: Vec<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Approximate Pareto frontier over resource axes
    Pareto {
        /// Result file or directory
        #[arg(long)]
        input: PathBuf,
        /// Axes to minimize
        #[arg(long, num_args = 2.., default_values_t = commands::pareto::DEFAULT_AXES.map(String::from))]
        analysis_stat: Vec<String>,
        /// Metric that must exceed each threshold
        #[arg(long, default_value = "efficiency")]
        target_stat: String,
        #[arg(long, num_args = 1.., default_values_t = commands::pareto::DEFAULT_THRESHOLDS)]
        target_thresholds: Vec<f64>,
        #[arg(long, num_args = 1..)]
        select: Vec<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Efficiency summary per hardware design point
    Summary {
        /// Result file or directory
        #[arg(long)]
        input: PathBuf,
        /// Columns that identify a design point (default: simd_count simd_width simd_lat)
        #[arg(long, num_args = 1..)]
        design_keys: Option<Vec<String>>,
        /// Efficiency a kernel must exceed to count as good
        #[arg(long, default_value_t = gemsweep_analysis::DEFAULT_THRESHOLD)]
        threshold: f64,
        #[arg(long, num_args = 1..)]
        select: Vec<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show k_c, unroll and iteration count for one kernel
    Tiling {
        #[arg(long)]
        mr: u32,
        #[arg(long)]
        nr: u32,
        /// Vector width in bits
        #[arg(long)]
        simd_width: u32,
        #[arg(long, default_value_t = 8)]
        assoc: u32,
        /// L1 size in KiB
        #[arg(long, default_value_t = 64)]
        l1_size: u32,
        /// Cache line size in bytes
        #[arg(long, default_value_t = 64)]
        cl_size: u32,
        #[arg(long, default_value_t = 8)]
        element_bytes: u32,
        #[arg(long, default_value_t = gemsweep_core::DEFAULT_MAX_VECTOR_REGISTERS)]
        max_vector_registers: u32,
        #[arg(long, default_value = "aarch64")]
        isa: String,
    },
}

/// One-or-more values per swept field.
#[derive(Args, Debug, Default)]
struct DomainArgs {
    #[arg(long, num_args = 1..)]
    mr: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    nr: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    simd_lat: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    simd_count: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    simd_width: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    simd_phreg_count: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    ld_count: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    st_count: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    cl_size: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    l1_size: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    assoc: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    iq_size: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    rob_size: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    decode_width: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    commit_width: Option<Vec<u32>>,
    #[arg(long, num_args = 1..)]
    fetch_buf_size: Option<Vec<u32>>,
}

impl DomainArgs {
    fn into_overrides(self) -> Vec<(Field, Vec<u32>)> {
        [
            (Field::Mr, self.mr),
            (Field::Nr, self.nr),
            (Field::SimdLat, self.simd_lat),
            (Field::SimdCount, self.simd_count),
            (Field::SimdWidth, self.simd_width),
            (Field::SimdPhregCount, self.simd_phreg_count),
            (Field::LdCount, self.ld_count),
            (Field::StCount, self.st_count),
            (Field::ClSize, self.cl_size),
            (Field::L1Size, self.l1_size),
            (Field::Assoc, self.assoc),
            (Field::IqSize, self.iq_size),
            (Field::RobSize, self.rob_size),
            (Field::DecodeWidth, self.decode_width),
            (Field::CommitWidth, self.commit_width),
            (Field::FetchBufSize, self.fetch_buf_size),
        ]
        .into_iter()
        .filter_map(|(field, values)| values.map(|v| (field, v)))
        .collect()
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Sweep {
            config,
            domains,
            isa,
            simulator,
            binary_dir,
            output_dir,
            format,
            split_bytes,
            max_workers,
            quiet,
            dry_run,
        } => {
            let (manifest, project_dir) = load_manifest(&cwd, config.as_deref())?;
            let overrides = commands::sweep::SweepOverrides {
                domains: domains.into_overrides(),
                isa,
                simulator,
                binary_dir,
                output_dir,
                format,
                split_bytes,
                max_workers,
                quiet,
            };
            commands::sweep::run(&project_dir.unwrap_or(cwd), manifest, &overrides, dry_run)
        }

        Commands::Worker => commands::worker::run(),

        Commands::Extract {
            stat_dir,
            select,
            targets,
            output,
            list_stats,
            max_workers,
        } => commands::extract::run(&stat_dir, &select, &targets, output.as_deref(), list_stats, max_workers),

        Commands::Best {
            input,
            group_by,
            metric,
            select,
            output,
        } => commands::best::run(&input, &group_by, &metric, &select, output.as_deref()),

        Commands::Pareto {
            input,
            analysis_stat,
            target_stat,
            target_thresholds,
            select,
            output,
        } => commands::pareto::run(
            &input,
            &analysis_stat,
            &target_stat,
            &target_thresholds,
            &select,
            output.as_deref(),
        ),

        Commands::Summary {
            input,
            design_keys,
            threshold,
            select,
            output,
        } => commands::summary::run(&input, design_keys, threshold, &select, output.as_deref()),

        Commands::Tiling {
            mr,
            nr,
            simd_width,
            assoc,
            l1_size,
            cl_size,
            element_bytes,
            max_vector_registers,
            isa,
        } => {
            let params = BlockingParams {
                mr,
                nr,
                simd_width,
                element_bytes,
                cache_assoc: assoc,
                cache_size_bytes: u64::from(l1_size) * 1024,
                line_size_bytes: cl_size,
                max_vector_registers,
            };
            commands::tiling::run(&params, Isa::parse(&isa)?)
        }
    }
}

/// An explicit `--config` must exist; otherwise search upward and fall back
/// to built-in defaults.
fn load_manifest(cwd: &Path, explicit: Option<&Path>) -> anyhow::Result<(SweepManifest, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let manifest = SweepManifest::load(path)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());
        return Ok((manifest, Some(dir)));
    }
    match SweepManifest::find_and_load(cwd).context("loading gemsweep.toml")? {
        Some((manifest, dir)) => Ok((manifest, Some(dir))),
        None => Ok((SweepManifest::default(), None)),
    }
}
