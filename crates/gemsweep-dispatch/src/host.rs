//! Host capacity detection and address-space limits.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DispatchError, Result};

const GIB: u64 = 1024 * 1024 * 1024;

/// Assumed when physical memory cannot be queried.
const FALLBACK_RAM_BYTES: u64 = 8 * GIB;

/// Cores and memory of the machine running the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostResources {
    pub cores: usize,
    pub total_ram_bytes: u64,
}

impl HostResources {
    pub fn detect() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let total_ram_bytes = physical_memory().unwrap_or_else(|| {
            warn!(fallback = FALLBACK_RAM_BYTES, "cannot query physical memory");
            FALLBACK_RAM_BYTES
        });
        debug!(cores, total_ram_bytes, "detected host resources");
        Self {
            cores,
            total_ram_bytes,
        }
    }
}

#[cfg(unix)]
fn physical_memory() -> Option<u64> {
    // SAFETY: sysconf has no preconditions.
    let (pages, page_size) = unsafe { (libc::sysconf(libc::_SC_PHYS_PAGES), libc::sysconf(libc::_SC_PAGESIZE)) };
    if pages <= 0 || page_size <= 0 {
        return None;
    }
    (pages as u64).checked_mul(page_size as u64)
}

#[cfg(not(unix))]
fn physical_memory() -> Option<u64> {
    None
}

/// Soft and hard `RLIMIT_AS` values in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpaceLimit {
    pub soft_bytes: u64,
    pub hard_bytes: u64,
}

impl AddressSpaceLimit {
    /// Per-worker cap: 12 GiB soft, 16 GiB hard.
    pub const WORKER_DEFAULT: AddressSpaceLimit = AddressSpaceLimit {
        soft_bytes: 12 * GIB,
        hard_bytes: 16 * GIB,
    };

    /// Limits expressed as fractions of `total_bytes`.
    pub fn fraction_of(total_bytes: u64, soft: f64, hard: f64) -> Self {
        let hard_bytes = (total_bytes as f64 * hard) as u64;
        let soft_bytes = ((total_bytes as f64 * soft) as u64).min(hard_bytes);
        Self {
            soft_bytes,
            hard_bytes,
        }
    }

    /// Apply to the current process. The hard limit is clamped to the
    /// existing one, since an unprivileged process cannot raise it.
    #[cfg(unix)]
    pub fn apply(&self) -> Result<()> {
        let mut current = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: `current` is a valid, writable rlimit.
        if unsafe { libc::getrlimit(libc::RLIMIT_AS, &mut current) } != 0 {
            return Err(DispatchError::ResourceLimit {
                detail: std::io::Error::last_os_error().to_string(),
            });
        }

        let mut hard = self.hard_bytes as libc::rlim_t;
        if current.rlim_max != libc::RLIM_INFINITY {
            hard = hard.min(current.rlim_max);
        }
        let soft = (self.soft_bytes as libc::rlim_t).min(hard);
        let limit = libc::rlimit {
            rlim_cur: soft,
            rlim_max: hard,
        };
        // SAFETY: `limit` is a valid rlimit.
        if unsafe { libc::setrlimit(libc::RLIMIT_AS, &limit) } != 0 {
            return Err(DispatchError::ResourceLimit {
                detail: std::io::Error::last_os_error().to_string(),
            });
        }
        debug!(soft = soft as u64, hard = hard as u64, "applied address space limit");
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn apply(&self) -> Result<()> {
        warn!("address space limits are not supported on this platform");
        Ok(())
    }
}
