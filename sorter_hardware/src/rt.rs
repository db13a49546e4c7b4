//! Real-time helpers for the step-pulse worker (Linux).
//!
//! Pulse timing on a stock kernel jitters under load; running the worker that
//! toggles the step pin under SCHED_FIFO, pinned to one core, with memory locked
//! keeps the half-period close to the configured value.
use nix::sched::{CpuSet, sched_setaffinity};
use nix::sys::mman::{MlockAllFlags, mlockall};
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::error::{HwError, Result};

/// Lock current and future pages into RAM.
pub fn lock_memory() -> Result<()> {
    mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE)
        .map_err(|e| HwError::Io(std::io::Error::from(e)))?;
    info!("memory locked");
    Ok(())
}

/// Pin the calling thread to `cpu`.
pub fn pin_current_thread(cpu: usize) -> Result<()> {
    let mut set = CpuSet::new();
    set.set(cpu)
        .map_err(|e| HwError::Io(std::io::Error::from(e)))?;
    sched_setaffinity(Pid::from_raw(0), &set).map_err(|e| HwError::Io(std::io::Error::from(e)))?;
    Ok(())
}

/// Switch the calling thread to SCHED_FIFO at `prio`, clamped to the system range.
pub fn set_fifo_priority(prio: i32) -> Result<()> {
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(libc::SCHED_FIFO),
            libc::sched_get_priority_max(libc::SCHED_FIFO),
        )
    };
    let param = libc::sched_param {
        sched_priority: prio.clamp(min, max),
    };
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::from_raw_os_error(rc);
        warn!(error = %err, "SCHED_FIFO refused; needs CAP_SYS_NICE or root");
        return Err(HwError::Io(err));
    }
    info!(prio = param.sched_priority, "SCHED_FIFO enabled");
    Ok(())
}

/// Apply everything for the calling thread; failures are logged, never fatal.
pub fn make_current_thread_realtime(prio: i32, cpu: Option<usize>) {
    if let Err(e) = set_fifo_priority(prio) {
        warn!(error = %e, "continuing without real-time priority");
    }
    if let Some(cpu) = cpu
        && let Err(e) = pin_current_thread(cpu)
    {
        warn!(cpu, error = %e, "cpu affinity unchanged");
    }
}
