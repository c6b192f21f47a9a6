//! `gemsweep worker`: run one chunk for the dispatcher.

use std::io;

use anyhow::Result;

/// Read a work order from stdin and answer with a partial table on stdout.
pub fn run() -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    gemsweep_dispatch::serve(stdin.lock(), stdout.lock())?;
    Ok(())
}
