//! Simulator driven as an external process.
//!
//! The simulator is started as
//! `<command> [args..] --config <config.json> <binary> <iterations>` and
//! reports exit events as JSON lines on stdout:
//!
//! ```text
//! {"event":"workbegin"}
//! {"event":"workend","stats":{"groups":[...]}}
//! {"event":"exit","cause":"exiting with last active thread context"}
//! ```
//!
//! Lines that are not JSON objects are treated as simulator chatter and
//! skipped. An event other than `workbegin`/`workend`, or end of output,
//! ends the simulation.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

use crate::config::{SimulatorConfig, SimulatorSettings};
use crate::error::{Result, SimError};
use crate::runner::{ExitEvent, Launcher, Simulator};
use crate::stats::StatTree;

/// Launches the configured simulator executable.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    settings: SimulatorSettings,
}

impl ProcessLauncher {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self { settings }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, config: &SimulatorConfig) -> Result<Box<dyn Simulator>> {
        if !config.workload.binary.is_file() {
            return Err(SimError::MissingBinary {
                path: config.workload.binary.clone(),
            });
        }

        let mut config_file = tempfile::Builder::new()
            .prefix("gemsweep-sim-")
            .suffix(".json")
            .tempfile()?;
        config_file.write_all(config.to_json()?.as_bytes())?;
        config_file.flush()?;

        let mut command = Command::new(&self.settings.command);
        command
            .args(&self.settings.args)
            .arg("--config")
            .arg(config_file.path())
            .arg(&config.workload.binary)
            .arg(config.workload.iterations.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.settings.quiet {
                Stdio::null()
            } else {
                Stdio::inherit()
            });
        debug!(?command, "spawning simulator");

        let mut child = command.spawn().map_err(|source| SimError::Spawn {
            command: self.settings.command.display().to_string(),
            source,
        })?;
        let stdout = child.stdout.take().ok_or_else(|| SimError::Protocol {
            detail: "simulator stdout was not captured".to_string(),
        })?;

        Ok(Box::new(ProcessSimulator {
            child,
            lines: BufReader::new(stdout),
            _config_file: config_file,
            finished: false,
        }))
    }
}

/// One running simulator process.
pub struct ProcessSimulator {
    child: Child,
    lines: BufReader<ChildStdout>,
    _config_file: NamedTempFile,
    finished: bool,
}

#[derive(Deserialize)]
struct EventLine {
    event: String,
    #[serde(default)]
    stats: Option<StatTree>,
    #[serde(default)]
    cause: Option<String>,
}

/// Decode one stdout line. `None` for lines that carry no event.
pub fn parse_event_line(line: &str) -> Result<Option<ExitEvent>> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return Ok(None);
    }
    let parsed: EventLine = match serde_json::from_str(trimmed) {
        Ok(parsed) => parsed,
        Err(e) => {
            trace!(error = %e, "ignoring non-event line");
            return Ok(None);
        }
    };
    let event = match parsed.event.as_str() {
        "workbegin" => ExitEvent::WorkBegin,
        "workend" => {
            let stats = parsed.stats.ok_or_else(|| SimError::Protocol {
                detail: "workend event without stats".to_string(),
            })?;
            ExitEvent::WorkEnd(stats)
        }
        other => ExitEvent::Exit {
            cause: parsed.cause.unwrap_or_else(|| other.to_string()),
        },
    };
    Ok(Some(event))
}

impl ProcessSimulator {
    fn wait_for_exit(&mut self) -> Result<ExitEvent> {
        self.finished = true;
        let status = self.child.wait()?;
        if status.success() {
            Ok(ExitEvent::Exit {
                cause: "simulator exited".to_string(),
            })
        } else {
            Err(SimError::SimulatorFailed {
                status: status.to_string(),
            })
        }
    }
}

impl Simulator for ProcessSimulator {
    fn simulate(&mut self) -> Result<ExitEvent> {
        if self.finished {
            return Ok(ExitEvent::Exit {
                cause: "simulator exited".to_string(),
            });
        }
        let mut line = String::new();
        loop {
            line.clear();
            if self.lines.read_line(&mut line)? == 0 {
                return self.wait_for_exit();
            }
            match parse_event_line(&line)? {
                Some(ExitEvent::Exit { cause }) => {
                    let _ = self.wait_for_exit()?;
                    return Ok(ExitEvent::Exit { cause });
                }
                Some(event) => return Ok(event),
                None => trace!(line = line.trim_end(), "simulator output"),
            }
        }
    }

    fn reset_stats(&mut self) -> Result<()> {
        // The process resets its own counters when it reports workbegin.
        Ok(())
    }
}

impl Drop for ProcessSimulator {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.child.kill() {
            warn!(error = %e, "failed to stop simulator");
        }
        let _ = self.child.wait();
    }
}
