use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock shared by the belt integrator, the step pulser and the debouncers.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - secs_since(): elapsed seconds from an epoch Instant, as used by dead reckoning
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Seconds elapsed since `epoch`, saturating at 0 on underflow.
    fn secs_since(&self, epoch: Instant) -> f64 {
        self.now().saturating_duration_since(epoch).as_secs_f64()
    }

    /// Microseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn micros_since(&self, epoch: Instant) -> u64 {
        let us = self.now().saturating_duration_since(epoch).as_micros();
        (us.min(u128::from(u64::MAX))) as u64
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Manual clock for tests. Clones share one timeline.
    ///
    /// `sleep(d)` moves the timeline forward by `d` and yields, so a worker
    /// pacing itself on this clock never blocks the test. The offset is a
    /// single atomic so edge callbacks can read it without locking.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset_ns: Arc<AtomicU64>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset_ns: Arc::new(AtomicU64::new(0)),
            }
        }

        pub fn advance(&self, d: Duration) {
            let ns = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
            let _ = self
                .offset_ns
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                    Some(cur.saturating_add(ns))
                });
        }

        /// Simulated time since construction.
        pub fn elapsed(&self) -> Duration {
            Duration::from_nanos(self.offset_ns.load(Ordering::Acquire))
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
            thread::yield_now();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn sleep_advances_without_blocking() {
            let clock = TestClock::new();
            let t0 = clock.now();
            clock.sleep(Duration::from_secs(3600));
            assert_eq!(clock.secs_since(t0), 3600.0);
            assert_eq!(clock.micros_since(t0), 3_600_000_000);
        }

        #[test]
        fn clones_share_time() {
            let a = TestClock::new();
            let b = a.clone();
            a.advance(Duration::from_millis(250));
            assert_eq!(b.elapsed(), Duration::from_millis(250));
        }
    }
}
