//! Common time helpers for sorter_core.

use std::time::Duration;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Step half-period for a pulse rate in steps per second.
/// - Clamps `steps_per_sec` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn half_period(steps_per_sec: u32) -> Duration {
    Duration::from_micros((MICROS_PER_SEC / (2 * u64::from(steps_per_sec.max(1)))).max(1))
}

/// How long the belt must run at `speed` to carry a part `distance` units:
/// `distance / (|speed| * multiplier)`.
///
/// Returns `None` for a stopped belt or a non-finite/negative result.
pub fn travel_time(distance: f64, speed: i8, multiplier: f64) -> Option<Duration> {
    if speed == 0 {
        return None;
    }
    let rate = f64::from(speed.unsigned_abs()) * multiplier;
    Duration::try_from_secs_f64(distance / rate).ok()
}

/// Milliseconds in a duration, saturating.
#[inline]
pub fn as_ms(d: Duration) -> u64 {
    (d.as_millis().min(u128::from(u64::MAX))) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_period_clamps() {
        assert_eq!(half_period(0), Duration::from_micros(500_000));
        assert_eq!(half_period(5_000), Duration::from_micros(100));
        assert_eq!(half_period(u32::MAX), Duration::from_micros(1));
    }

    #[test]
    fn travel_time_divides_by_rate() {
        // 12000 units at speed 3 with 200 units/s per speed step = 20 s
        assert_eq!(travel_time(12_000.0, 3, 200.0), Some(Duration::from_secs(20)));
        // reverse direction takes just as long
        assert_eq!(travel_time(12_000.0, -3, 200.0), Some(Duration::from_secs(20)));
    }

    #[test]
    fn travel_time_rejects_degenerate_inputs() {
        assert_eq!(travel_time(100.0, 0, 200.0), None);
        assert_eq!(travel_time(-1.0, 2, 200.0), None);
        assert_eq!(travel_time(100.0, 2, 0.0), None);
    }
}
