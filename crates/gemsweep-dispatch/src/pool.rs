//! Bounded worker pool.
//!
//! At most `max_workers` chunks execute at once. Outcomes are delivered to
//! the caller on the dispatching thread in completion order, not
//! submission order. A failing or panicking chunk is reported and the
//! rest of the sweep continues.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam_channel as channel;
use tracing::debug;

use gemsweep_core::OuterPoint;
use gemsweep_table::PartialTable;

use crate::cancel::CancellationToken;
use crate::chunk::Chunk;
use crate::error::{DispatchError, Result};
use crate::executor::ChunkExecutor;

/// Result of one chunk.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub outer: OuterPoint,
    pub result: Result<PartialTable>,
}

/// Execute `chunks` on up to `max_workers` threads, feeding each outcome
/// to `on_outcome` as it arrives. If `on_outcome` fails, remaining chunks
/// are abandoned, running ones are cancelled and the first error is
/// returned once all workers have stopped.
pub fn dispatch<E, F>(
    chunks: Vec<Chunk>,
    executor: &E,
    max_workers: usize,
    token: &CancellationToken,
    mut on_outcome: F,
) -> Result<()>
where
    E: ChunkExecutor + ?Sized,
    F: FnMut(ChunkOutcome) -> Result<()>,
{
    if chunks.is_empty() {
        return Ok(());
    }
    let workers = max_workers.clamp(1, chunks.len());
    let (stop, stop_handle) = token.child();

    let (job_tx, job_rx) = channel::unbounded::<Chunk>();
    for chunk in chunks {
        // The receiver is alive until the scope below ends.
        let _ = job_tx.send(chunk);
    }
    drop(job_tx);
    let (out_tx, out_rx) = channel::unbounded::<ChunkOutcome>();

    let mut first_error = None;
    thread::scope(|scope| {
        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let out_tx = out_tx.clone();
            let stop = &stop;
            scope.spawn(move || {
                while let Ok(chunk) = job_rx.recv() {
                    if stop.is_cancelled() {
                        break;
                    }
                    debug!(worker, chunk = chunk.index(), "dispatching chunk");
                    let result = panic::catch_unwind(AssertUnwindSafe(|| executor.execute(&chunk, stop)))
                        .unwrap_or_else(|payload| {
                            Err(DispatchError::Panicked {
                                message: panic_message(payload.as_ref()),
                            })
                        });
                    let outcome = ChunkOutcome {
                        outer: chunk.outer,
                        result,
                    };
                    if out_tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(out_tx);

        for outcome in out_rx.iter() {
            if first_error.is_some() {
                continue;
            }
            if let Err(e) = on_outcome(outcome) {
                stop_handle.cancel();
                first_error = Some(e);
            }
        }
    });

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use gemsweep_core::{Field, Isa};
    use gemsweep_table::Column;
    use gemsweep_table::Value;

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk {
                isa: Isa::Aarch64,
                outer: OuterPoint {
                    index: i,
                    values: vec![(Field::Mr, 1), (Field::Nr, i as u32 + 1)],
                },
                inner: vec![],
            })
            .collect()
    }

    /// Sleeps inversely to the chunk index and tracks concurrency.
    struct SlowExecutor {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ChunkExecutor for SlowExecutor {
        fn execute(&self, chunk: &Chunk, _token: &CancellationToken) -> Result<PartialTable> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5 * (6 - chunk.index() as u64 % 6)));
            self.active.fetch_sub(1, Ordering::SeqCst);
            if chunk.index() == 3 {
                return Err(DispatchError::WorkerFailed {
                    chunk: 3,
                    status: "exit status: 1".into(),
                });
            }
            if chunk.index() == 4 {
                panic!("simulator blew up");
            }
            Ok(PartialTable {
                rows: 1,
                columns: vec![Column {
                    name: "chunk".into(),
                    values: vec![Value::Int(chunk.index() as i64)],
                }],
            })
        }
    }

    #[test]
    fn bounded_concurrency_and_isolation() {
        let exec = SlowExecutor {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let mut ok = Vec::new();
        let mut failed = Vec::new();
        dispatch(chunks(12), &exec, 3, &CancellationToken::never(), |outcome| {
            match outcome.result {
                Ok(_) => ok.push(outcome.outer.index),
                Err(_) => failed.push(outcome.outer.index),
            }
            Ok(())
        })
        .unwrap();

        assert!(exec.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(ok.len() + failed.len(), 12);
        failed.sort();
        assert_eq!(failed, vec![3, 4]);
    }

    #[test]
    fn callback_error_stops_dispatch() {
        let exec = SlowExecutor {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let mut seen = 0;
        let result = dispatch(chunks(30), &exec, 2, &CancellationToken::never(), |_| {
            seen += 1;
            Err(DispatchError::Cancelled)
        });
        assert!(matches!(result, Err(DispatchError::Cancelled)));
        assert_eq!(seen, 1);
    }

    #[test]
    fn cancelled_token_runs_nothing() {
        let exec = SlowExecutor {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let (token, handle) = crate::cancel::cancellation_pair();
        handle.cancel();
        let mut seen = 0;
        dispatch(chunks(5), &exec, 4, &token, |_| {
            seen += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, 0);
    }

    #[test]
    fn empty_input() {
        let exec = SlowExecutor {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        dispatch(Vec::new(), &exec, 4, &CancellationToken::never(), |_| Ok(())).unwrap();
    }
}
