//! Lock-free edge debouncer, safe to call from an interrupt callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::SharedClock;

const NEVER: u64 = u64::MAX;

/// Accepts an edge only if the previous accepted edge is at least `window` old.
pub struct Debouncer {
    clock: SharedClock,
    epoch: Instant,
    window_us: u64,
    last_us: AtomicU64,
}

impl Debouncer {
    pub fn new(clock: SharedClock, window: Duration) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            window_us: u64::try_from(window.as_micros()).unwrap_or(u64::MAX),
            last_us: AtomicU64::new(NEVER),
        }
    }

    /// Never blocks and never allocates.
    pub fn accept(&self) -> bool {
        let now = self.clock.micros_since(self.epoch);
        let last = self.last_us.load(Ordering::Acquire);
        if last != NEVER && now.saturating_sub(last) < self.window_us {
            return false;
        }
        // a racing edge that lost the exchange is a bounce of the winner
        self.last_us
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorter_traits::clock::test_clock::TestClock;
    use std::sync::Arc;

    #[test]
    fn bounces_inside_window_are_dropped() {
        let clock = TestClock::new();
        let d = Debouncer::new(Arc::new(clock.clone()), Duration::from_millis(50));
        assert!(d.accept());
        clock.advance(Duration::from_millis(10));
        assert!(!d.accept());
        clock.advance(Duration::from_millis(39));
        assert!(!d.accept());
        clock.advance(Duration::from_millis(1));
        assert!(d.accept());
    }

    #[test]
    fn window_restarts_from_last_accepted_edge() {
        let clock = TestClock::new();
        let d = Debouncer::new(Arc::new(clock.clone()), Duration::from_millis(50));
        assert!(d.accept());
        for _ in 0..10 {
            clock.advance(Duration::from_millis(20));
            d.accept();
        }
        // accepted at 0, 60, 120, 180; now at 200
        clock.advance(Duration::from_millis(20));
        assert!(!d.accept());
        clock.advance(Duration::from_millis(10));
        assert!(d.accept());
    }

    #[test]
    fn zero_window_accepts_everything() {
        let clock = TestClock::new();
        let d = Debouncer::new(Arc::new(clock), Duration::ZERO);
        assert!(d.accept());
        assert!(d.accept());
    }
}
