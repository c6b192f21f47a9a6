//! The per-point simulation loop.
//!
//! A benchmark brackets each measured phase with `workbegin` and
//! `workend` markers. Statistics are reset at `workbegin` and captured
//! at `workend`; any other exit ends the simulation. A point therefore
//! yields one [`RunRecord`] per measured phase.

use tracing::{debug, info};

use gemsweep_core::ParameterPoint;
use gemsweep_table::RunRecord;

use crate::config::{SimulatorConfig, SimulatorSettings};
use crate::error::Result;
use crate::stats::StatTree;

/// Statistic reported after each measured phase.
pub const CYCLES_STAT: &str = "system.cpu.numCycles";

/// Why the simulator returned control.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitEvent {
    /// A measured phase is about to start.
    WorkBegin,
    /// A measured phase ended; carries the statistics accumulated since
    /// the last reset.
    WorkEnd(StatTree),
    /// Anything else, including normal program exit.
    Exit { cause: String },
}

/// A running simulator instance.
pub trait Simulator {
    /// Advance until the next exit event.
    fn simulate(&mut self) -> Result<ExitEvent>;

    /// Zero all statistics.
    fn reset_stats(&mut self) -> Result<()>;
}

/// Creates simulator instances for configurations.
pub trait Launcher: Send + Sync {
    fn launch(&self, config: &SimulatorConfig) -> Result<Box<dyn Simulator>>;
}

/// Anything that can turn a parameter point into run records.
pub trait PointRunner: Send + Sync {
    fn run_point(&self, point: &ParameterPoint) -> Result<Vec<RunRecord>>;
}

/// Drive `sim` until it exits, collecting one record per measured phase.
pub fn run_phases(sim: &mut dyn Simulator, point: &ParameterPoint) -> Result<Vec<RunRecord>> {
    let mut records = Vec::new();
    let mut run = 0;
    loop {
        match sim.simulate()? {
            ExitEvent::WorkBegin => {
                debug!(run, "workbegin, resetting statistics");
                sim.reset_stats()?;
            }
            ExitEvent::WorkEnd(tree) => {
                let record = RunRecord::new(point.clone(), run, tree.flatten());
                if let Some(cycles) = record.stat(CYCLES_STAT) {
                    info!(run, cycles, "workend");
                } else {
                    info!(run, "workend");
                }
                records.push(record);
                run += 1;
            }
            ExitEvent::Exit { cause } => {
                debug!(%cause, runs = records.len(), "simulation ended");
                break;
            }
        }
    }
    Ok(records)
}

/// Runs points through simulators created by a [`Launcher`].
pub struct SimulationRunner<L> {
    launcher: L,
    settings: SimulatorSettings,
}

impl<L: Launcher> SimulationRunner<L> {
    pub fn new(launcher: L, settings: SimulatorSettings) -> Self {
        Self { launcher, settings }
    }

    pub fn settings(&self) -> &SimulatorSettings {
        &self.settings
    }
}

impl<L: Launcher> PointRunner for SimulationRunner<L> {
    fn run_point(&self, point: &ParameterPoint) -> Result<Vec<RunRecord>> {
        let config = SimulatorConfig::for_point(point, &self.settings)?;
        debug!(%point, iterations = config.workload.iterations, "launching simulator");
        let mut sim = self.launcher.launch(&config)?;
        run_phases(sim.as_mut(), point)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use crate::stats::{Stat, StatGroup};
    use gemsweep_core::{Field, Isa};

    struct Scripted {
        events: VecDeque<ExitEvent>,
        resets: usize,
    }

    impl Simulator for Scripted {
        fn simulate(&mut self) -> Result<ExitEvent> {
            Ok(self.events.pop_front().unwrap_or(ExitEvent::Exit {
                cause: "exiting with last active thread context".into(),
            }))
        }

        fn reset_stats(&mut self) -> Result<()> {
            self.resets += 1;
            Ok(())
        }
    }

    fn cycles(n: f64) -> ExitEvent {
        ExitEvent::WorkEnd(StatTree {
            groups: vec![StatGroup::new("system")
                .with_group(StatGroup::new("cpu").with_stat(Stat::scalar("numCycles", n)))],
        })
    }

    fn point() -> ParameterPoint {
        ParameterPoint::from_pairs(Isa::Riscv64, [(Field::Mr, 2), (Field::Nr, 4)])
    }

    #[test]
    fn one_record_per_workend() {
        let mut sim = Scripted {
            events: VecDeque::from(vec![
                ExitEvent::WorkBegin,
                cycles(100.0),
                ExitEvent::WorkBegin,
                cycles(90.0),
            ]),
            resets: 0,
        };
        let records = run_phases(&mut sim, &point()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(sim.resets, 2);
        assert_eq!(records[0].run, 0);
        assert_eq!(records[1].run, 1);
        assert_eq!(records[1].stat(CYCLES_STAT), Some(90.0));
    }

    #[test]
    fn exit_before_any_phase_yields_nothing() {
        let mut sim = Scripted {
            events: VecDeque::from(vec![ExitEvent::WorkBegin, ExitEvent::Exit { cause: "m5_exit".into() }, cycles(1.0)]),
            resets: 0,
        };
        assert!(run_phases(&mut sim, &point()).unwrap().is_empty());
    }

    struct RecordingLauncher {
        launched: Mutex<Vec<SimulatorConfig>>,
    }

    impl Launcher for RecordingLauncher {
        fn launch(&self, config: &SimulatorConfig) -> Result<Box<dyn Simulator>> {
            self.launched.lock().unwrap().push(config.clone());
            Ok(Box::new(Scripted {
                events: VecDeque::from(vec![ExitEvent::WorkBegin, cycles(10.0)]),
                resets: 0,
            }))
        }
    }

    #[test]
    fn runner_builds_config_and_runs() {
        let settings = SimulatorSettings {
            command: PathBuf::from("sim"),
            args: vec![],
            binary_dir: PathBuf::from("bin"),
            quiet: true,
            element_bytes: 8,
            max_vector_registers: 32,
        };
        let runner = SimulationRunner::new(
            RecordingLauncher {
                launched: Mutex::new(Vec::new()),
            },
            settings,
        );
        let mut p = gemsweep_core::enumerate(
            &gemsweep_core::ParameterDomains::with_defaults(Isa::Riscv64),
            gemsweep_core::Feasibility::default(),
        )
        .remove(0);
        p.set(Field::IqSize, 48);
        let records = runner.run_point(&p).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].point, p);
        let launched = runner.launcher.launched.lock().unwrap();
        assert_eq!(launched[0].core.iq_entries, 48);
        assert!(launched[0]
            .workload
            .binary
            .ends_with("riscv64/gemmbench_2_4_avecpreload_bvecfmavf"));
    }

    #[test]
    fn runner_rejects_infeasible_point() {
        let settings = SimulatorSettings {
            command: PathBuf::from("sim"),
            args: vec![],
            binary_dir: PathBuf::from("bin"),
            quiet: true,
            element_bytes: 8,
            max_vector_registers: 16,
        };
        let runner = SimulationRunner::new(
            RecordingLauncher {
                launched: Mutex::new(Vec::new()),
            },
            settings,
        );
        let mut p = point();
        p.set(Field::SimdWidth, 128);
        p.set(Field::Nr, 8);
        assert!(runner.run_point(&p).is_err());
        assert!(runner.launcher.launched.lock().unwrap().is_empty());
    }
}
