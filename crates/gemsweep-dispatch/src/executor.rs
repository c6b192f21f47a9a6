//! Chunk executors.
//!
//! [`ProcessExecutor`] runs each chunk in a fresh worker process so that a
//! crashing or leaking simulator never takes the dispatcher with it, and
//! so memory is returned to the system after every chunk.
//! [`InProcessExecutor`] runs chunks on the pool thread itself.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use tracing::debug;

use gemsweep_sim::{PointRunner, SimulatorSettings};
use gemsweep_table::PartialTable;

use crate::cancel::CancellationToken;
use crate::chunk::{Chunk, WorkOrder};
use crate::error::{DispatchError, Result};
use crate::host::AddressSpaceLimit;
use crate::worker::execute_chunk;

/// Executes one chunk to completion.
pub trait ChunkExecutor: Send + Sync {
    fn execute(&self, chunk: &Chunk, token: &CancellationToken) -> Result<PartialTable>;
}

/// Runs chunks on the calling thread with a shared point runner.
pub struct InProcessExecutor<R> {
    runner: R,
}

impl<R: PointRunner> InProcessExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: PointRunner> ChunkExecutor for InProcessExecutor<R> {
    fn execute(&self, chunk: &Chunk, token: &CancellationToken) -> Result<PartialTable> {
        execute_chunk(chunk, &self.runner, token)
    }
}

/// Spawns one worker process per chunk.
///
/// The worker is `program args..`, receives a [`WorkOrder`] as JSON on
/// stdin and answers with a [`PartialTable`] as JSON on stdout.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: PathBuf,
    args: Vec<String>,
    simulator: SimulatorSettings,
    limit: Option<AddressSpaceLimit>,
    poll_interval: Duration,
}

impl ProcessExecutor {
    pub fn new(program: PathBuf, args: Vec<String>, simulator: SimulatorSettings) -> Self {
        Self {
            program,
            args,
            simulator,
            limit: Some(AddressSpaceLimit::WORKER_DEFAULT),
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Worker address-space limit, or `None` to leave workers unlimited.
    pub fn with_limit(mut self, limit: Option<AddressSpaceLimit>) -> Self {
        self.limit = limit;
        self
    }

    /// The running executable re-invoked with the hidden `worker` command.
    pub fn current_exe(simulator: SimulatorSettings) -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?, vec!["worker".to_string()], simulator))
    }
}

impl ChunkExecutor for ProcessExecutor {
    fn execute(&self, chunk: &Chunk, token: &CancellationToken) -> Result<PartialTable> {
        let order = WorkOrder {
            chunk: chunk.clone(),
            simulator: self.simulator.clone(),
            limit: self.limit,
        };
        let payload =
            serde_json::to_vec(&order).map_err(|e| DispatchError::Serialization(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        debug!(chunk = chunk.index(), pid = child.id(), "started worker");

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&payload) {
                reap(&mut child);
                return Err(e.into());
            }
        }
        let mut stdout = child.stdout.take().ok_or_else(|| DispatchError::WorkerFailed {
            chunk: chunk.index(),
            status: "stdout not captured".to_string(),
        })?;
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if token.is_cancelled() {
                reap(&mut child);
                return Err(DispatchError::Cancelled);
            }
            thread::sleep(self.poll_interval);
        };

        let output = reader.join().map_err(|_| DispatchError::WorkerFailed {
            chunk: chunk.index(),
            status: "output reader panicked".to_string(),
        })??;
        check_exit(chunk.index(), status, token)?;
        serde_json::from_slice(&output).map_err(|e| DispatchError::Serialization(e.to_string()))
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// A worker that died while the sweep was being cancelled was stopped, not
/// broken.
fn check_exit(chunk: usize, status: ExitStatus, token: &CancellationToken) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    if token.is_cancelled() {
        debug!(chunk, %status, "worker exited during cancellation");
        return Err(DispatchError::Cancelled);
    }
    Err(DispatchError::WorkerFailed {
        chunk,
        status: status.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemsweep_core::{Field, Isa, OuterPoint};

    fn chunk() -> Chunk {
        Chunk {
            isa: Isa::Aarch64,
            outer: OuterPoint {
                index: 0,
                values: vec![(Field::Mr, 2), (Field::Nr, 4)],
            },
            inner: vec![],
        }
    }

    fn settings() -> SimulatorSettings {
        SimulatorSettings {
            command: "unused".into(),
            args: vec![],
            binary_dir: "bin".into(),
            quiet: true,
            element_bytes: 8,
            max_vector_registers: 32,
        }
    }

    #[cfg(unix)]
    #[test]
    fn reads_partial_table_from_worker() {
        // `sh -c` stands in for the worker: it drains stdin and prints a table.
        let exec = ProcessExecutor::new(
            "sh".into(),
            vec![
                "-c".into(),
                r#"cat >/dev/null; echo '{"rows":1,"columns":[{"name":"mr","values":[2]}]}'"#.into(),
            ],
            settings(),
        )
        .with_limit(None);
        let part = exec.execute(&chunk(), &CancellationToken::never()).unwrap();
        assert_eq!(part.rows, 1);
        assert_eq!(part.columns[0].name, "mr");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_a_failure() {
        let exec = ProcessExecutor::new(
            "sh".into(),
            vec!["-c".into(), "cat >/dev/null; exit 3".into()],
            settings(),
        );
        assert!(matches!(
            exec.execute(&chunk(), &CancellationToken::never()),
            Err(DispatchError::WorkerFailed { chunk: 0, .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn cancellation_kills_worker() {
        let exec = ProcessExecutor::new(
            "sh".into(),
            vec!["-c".into(), "cat >/dev/null; sleep 30".into()],
            settings(),
        );
        let (token, handle) = crate::cancel::cancellation_pair();
        handle.cancel();
        let started = std::time::Instant::now();
        assert!(matches!(
            exec.execute(&chunk(), &token),
            Err(DispatchError::Cancelled)
        ));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn signal_exit_during_cancellation_is_not_a_failure() {
        use std::os::unix::process::ExitStatusExt;

        // wait status 2: terminated by SIGINT
        let interrupted = ExitStatus::from_raw(2);
        assert!(matches!(
            check_exit(4, interrupted, &CancellationToken::never()),
            Err(DispatchError::WorkerFailed { chunk: 4, .. })
        ));
        let (token, handle) = crate::cancel::cancellation_pair();
        handle.cancel();
        assert!(matches!(check_exit(4, interrupted, &token), Err(DispatchError::Cancelled)));
        assert!(check_exit(4, ExitStatus::from_raw(0), &token).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn worker_killed_by_interrupt_after_cancel_reports_cancelled() {
        let exec = ProcessExecutor::new(
            "sh".into(),
            vec!["-c".into(), "cat >/dev/null; kill -INT $$; sleep 30".into()],
            settings(),
        );
        let (token, handle) = crate::cancel::cancellation_pair();
        handle.cancel();
        assert!(matches!(
            exec.execute(&chunk(), &token),
            Err(DispatchError::Cancelled)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn worker_that_never_reads_its_order_is_reaped() {
        // Large enough to overflow the pipe buffer, so the write fails once
        // the worker is gone.
        let mut big = chunk();
        big.inner = vec![(Field::RobSize, (0..200_000).collect())];
        let exec = ProcessExecutor::new("sh".into(), vec!["-c".into(), "exit 0".into()], settings());
        let started = std::time::Instant::now();
        assert!(matches!(
            exec.execute(&big, &CancellationToken::never()),
            Err(DispatchError::Io(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
