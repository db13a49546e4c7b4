//! Real-time setup for the process (Linux with the `rt` feature).
//!
//! Runs on the main thread before the controller spawns its workers, so the
//! step-pulse threads inherit the scheduling policy and affinity.

#[cfg(all(feature = "rt", target_os = "linux"))]
pub fn setup_rt_once(rt: bool, prio: i32, cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        if let Err(e) = sorter_hardware::rt::lock_memory() {
            tracing::warn!(error = %e, "mlockall failed; needs CAP_IPC_LOCK and a large enough 'ulimit -l'");
        }
        sorter_hardware::rt::make_current_thread_realtime(prio, cpu);
    });
}

#[cfg(not(all(feature = "rt", target_os = "linux")))]
pub fn setup_rt_once(rt: bool, prio: i32, cpu: Option<usize>) {
    if rt {
        tracing::warn!(
            prio,
            ?cpu,
            "--rt ignored: build with the `rt` feature on Linux for SCHED_FIFO and mlockall"
        );
    }
}
