//! `gemsweep sweep`: run a parameter sweep.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use gemsweep_core::{Feasibility, Field, ParameterDomains, ParameterSpace};
use gemsweep_dispatch::{
    run_sweep, CancellationToken, ChunkExecutor, HostResources, ProcessExecutor, ResultSink, RollingFileSink,
    SweepPlan, SweepReport,
};
use gemsweep_table::TableFormat;

use crate::manifest::SweepManifest;

/// Command-line overrides on top of `gemsweep.toml`.
#[derive(Debug, Clone, Default)]
pub struct SweepOverrides {
    pub domains: Vec<(Field, Vec<u32>)>,
    pub isa: Option<String>,
    pub simulator: Option<PathBuf>,
    pub binary_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<String>,
    pub split_bytes: Option<u64>,
    pub max_workers: Option<usize>,
    pub quiet: bool,
}

impl SweepOverrides {
    /// Fold the overrides into `manifest`.
    pub fn apply(&self, manifest: &mut SweepManifest) -> Result<()> {
        if let Some(isa) = &self.isa {
            manifest.sweep.isa = isa.clone();
        }
        for (field, values) in &self.domains {
            manifest.sweep.domains.insert(field.name().to_string(), values.clone());
        }
        if let Some(command) = &self.simulator {
            manifest.simulator.command = Some(command.clone());
        }
        if let Some(dir) = &self.binary_dir {
            manifest.simulator.binary_dir = Some(dir.clone());
        }
        if self.quiet {
            manifest.simulator.quiet = true;
        }
        if let Some(dir) = &self.output_dir {
            manifest.output.dir = dir.clone();
        }
        if let Some(format) = &self.format {
            manifest.output.format =
                TableFormat::parse(format).with_context(|| format!("unknown output format '{format}'"))?;
        }
        if let Some(split) = self.split_bytes {
            manifest.output.split_bytes = split;
        }
        if let Some(workers) = self.max_workers {
            manifest.resources.max_workers = workers;
        }
        Ok(())
    }
}

/// The parameter space a manifest describes.
pub fn space(manifest: &SweepManifest) -> Result<ParameterSpace> {
    let domains: ParameterDomains = manifest.domains()?;
    Ok(ParameterSpace::new(
        domains,
        Feasibility {
            max_vector_registers: manifest.sweep.max_vector_registers,
        },
    ))
}

/// Print the partition without running anything.
pub fn describe(plan: &SweepPlan) {
    println!("Outer fields:   {}", join_fields(&plan.grid.outer_fields));
    println!("Chunks:         {}", plan.chunks.len());
    println!("Points/chunk:   {}", plan.grid.inner_count());
    println!("Total points:   {}", plan.total_points());
    println!("Max workers:    {}", plan.max_workers());
}

fn join_fields(fields: &[Field]) -> String {
    if fields.is_empty() {
        return "(none)".to_string();
    }
    fields.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
}

/// Plan and run the sweep with the given executor and sink.
pub fn execute(
    manifest: &SweepManifest,
    host: &HostResources,
    executor: &dyn ChunkExecutor,
    sink: &mut dyn ResultSink,
    token: &CancellationToken,
) -> Result<SweepReport> {
    let space = space(manifest)?;
    let plan = SweepPlan::new(&space, &manifest.resources.budget(host));
    if plan.chunks.is_empty() {
        bail!("no feasible parameter combinations");
    }
    info!(points = plan.total_points(), chunks = plan.chunks.len(), "starting sweep");
    Ok(run_sweep(plan, executor, sink, token)?)
}

/// Run a sweep: workers are this executable re-invoked as `gemsweep worker`.
pub fn run(project_dir: &Path, mut manifest: SweepManifest, overrides: &SweepOverrides, dry_run: bool) -> Result<()> {
    overrides.apply(&mut manifest)?;
    let host = HostResources::detect();

    if dry_run {
        let space = space(&manifest)?;
        describe(&SweepPlan::new(&space, &manifest.resources.budget(&host)));
        return Ok(());
    }

    // Fail on missing settings before any work starts.
    let settings = manifest.simulator_settings()?;
    if let Err(e) = manifest.resources.parent_limit(&host).apply() {
        warn!(error = %e, "could not limit dispatcher address space");
    }

    let output_dir = project_dir.join(&manifest.output.dir);
    std::fs::create_dir_all(&output_dir).with_context(|| format!("creating {}", output_dir.display()))?;
    let executor = ProcessExecutor::current_exe(settings)?.with_limit(Some(manifest.resources.worker_limit()));
    let mut sink = RollingFileSink::new(
        &output_dir,
        &manifest.output.stem,
        manifest.output.format,
        manifest.output.split_bytes,
    );
    let token = CancellationToken::never().with_interrupt();

    let report = execute(&manifest, &host, &executor, &mut sink, &token)?;
    print_report(&report);
    if report.cancelled {
        bail!(
            "sweep interrupted after {}/{} chunks",
            report.chunks_completed,
            report.chunks_total
        );
    }
    Ok(())
}

pub fn print_report(report: &SweepReport) {
    println!(
        "Completed {}/{} chunks, {} rows",
        report.chunks_completed, report.chunks_total, report.rows
    );
    for failure in &report.failures {
        let label = failure
            .outer
            .values
            .iter()
            .map(|(f, v)| format!("{f}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  failed: {label}: {}", failure.reason);
    }
    for path in &report.outputs {
        println!("Wrote {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_manifest_values() {
        let mut manifest = SweepManifest::default();
        let overrides = SweepOverrides {
            domains: vec![(Field::Mr, vec![1, 2]), (Field::RobSize, vec![64])],
            isa: Some("riscv64".into()),
            format: Some("csv".into()),
            max_workers: Some(3),
            quiet: true,
            ..SweepOverrides::default()
        };
        overrides.apply(&mut manifest).unwrap();
        let space = space(&manifest).unwrap();
        assert_eq!(space.domains.values(Field::Mr), &[1, 2]);
        assert_eq!(space.domains.values(Field::RobSize), &[64]);
        assert_eq!(manifest.output.format, TableFormat::Csv);
        assert_eq!(manifest.resources.max_workers, 3);
        assert!(manifest.simulator.quiet);
    }

    #[test]
    fn bad_format_is_rejected() {
        let overrides = SweepOverrides {
            format: Some("h5".into()),
            ..SweepOverrides::default()
        };
        assert!(overrides.apply(&mut SweepManifest::default()).is_err());
    }

    #[test]
    fn missing_simulator_fails_before_work() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), SweepManifest::default(), &SweepOverrides::default(), false).unwrap_err();
        assert!(err.to_string().contains("simulator command"));
        assert!(!dir.path().join("results").exists());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), SweepManifest::default(), &SweepOverrides::default(), true).unwrap();
        assert!(!dir.path().join("results").exists());
    }
}
