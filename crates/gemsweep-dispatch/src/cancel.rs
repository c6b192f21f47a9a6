//! Cooperative cancellation for sweeps.
//!
//! A [`CancellationToken`] is handed to the pool and to every executor,
//! which check it between chunks and while waiting on worker processes.
//! The matching [`CancellationHandle`] stays with whoever may stop the
//! sweep. Tokens can be chained so a sweep can abort itself without
//! touching the caller's token, and can additionally observe SIGINT.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Token checked by the dispatcher to detect cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    parent: Option<Box<CancellationToken>>,
    watch_interrupt: bool,
}

/// Handle that cancels the associated token.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    flag: Arc<AtomicBool>,
}

/// Create a new cancellation pair (token, handle).
pub fn cancellation_pair() -> (CancellationToken, CancellationHandle) {
    let flag = Arc::new(AtomicBool::new(false));
    (
        CancellationToken {
            flag: Arc::clone(&flag),
            parent: None,
            watch_interrupt: false,
        },
        CancellationHandle { flag },
    )
}

impl CancellationToken {
    /// A token that is never cancelled unless a child handle is used.
    pub fn never() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || (self.watch_interrupt && INTERRUPTED.load(Ordering::Relaxed))
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// A token cancelled by its own handle or whenever `self` is.
    pub fn child(&self) -> (CancellationToken, CancellationHandle) {
        let (mut token, handle) = cancellation_pair();
        token.parent = Some(Box::new(self.clone()));
        (token, handle)
    }

    /// Also treat a received SIGINT as cancellation. Installs the handler.
    pub fn with_interrupt(mut self) -> Self {
        install_interrupt_handler();
        self.watch_interrupt = true;
        self
    }
}

impl CancellationHandle {
    /// Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Whether SIGINT has been received since the handler was installed.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

#[cfg(unix)]
extern "C" fn on_interrupt(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

#[cfg(unix)]
fn install_interrupt_handler() {
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_interrupt_handler() {}

/// Ignore SIGINT in this process and in everything it spawns afterwards.
///
/// Worker processes call this at start: the dispatcher decides when a
/// sweep stops, and kills its workers itself.
#[cfg(unix)]
pub fn ignore_interrupts() {
    // SAFETY: SIG_IGN installs no handler code.
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_IGN);
    }
}

#[cfg(not(unix))]
pub fn ignore_interrupts() {}
