//! Log output for the command line.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the default log filter.
pub const LOG_ENV: &str = "GEMSWEEP_LOG";

/// Install the stderr subscriber. `level` wins over `GEMSWEEP_LOG`, which
/// wins over `info`. Stdout is left alone: worker processes answer on it.
pub fn init(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
