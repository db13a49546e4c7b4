//! Belt drive: PWM output and dead-reckoned distance.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use rstest::rstest;
use sorter_core::{Belt, BeltCfg, BeltDrive, SorterError};
use sorter_hardware::{SimLine, SimPwm};
use sorter_traits::clock::test_clock::TestClock;

fn belt(clock: &TestClock) -> (Belt, SimLine, SimPwm) {
    let dir = SimLine::new();
    let pwm = SimPwm::new();
    let belt = Belt::new(
        BeltDrive {
            direction: Box::new(dir.clone()),
            pwm: Box::new(pwm.clone()),
        },
        BeltCfg::default(),
        Arc::new(clock.clone()),
    );
    (belt, dir, pwm)
}

#[rstest]
#[case(3, true, 600.0)]
#[case(-2, false, 400.0)]
#[case(5, true, 1000.0)]
fn start_sets_direction_and_frequency(
    #[case] speed: i8,
    #[case] forward: bool,
    #[case] frequency: f64,
) {
    let clock = TestClock::new();
    let (belt, dir, pwm) = belt(&clock);
    belt.start(speed).unwrap();
    assert_eq!(dir.is_high(), forward);
    assert_eq!(pwm.frequency_hz(), frequency);
    assert_eq!(pwm.duty_cycle(), 0.5);
    assert!(pwm.is_running());
    assert_eq!(belt.speed(), speed);
}

#[test]
fn start_zero_stops() {
    let clock = TestClock::new();
    let (belt, _dir, pwm) = belt(&clock);
    belt.start(2).unwrap();
    belt.start(0).unwrap();
    assert!(!pwm.is_running());
    assert!(!belt.is_running());
}

#[rstest]
#[case(6)]
#[case(-6)]
#[case(i8::MIN)]
fn out_of_range_speed_is_rejected(#[case] speed: i8) {
    let clock = TestClock::new();
    let (belt, _dir, pwm) = belt(&clock);
    let err = belt.start(speed).unwrap_err();
    assert_eq!(err, SorterError::InvalidSpeed { speed, max: 5 });
    assert!(!pwm.is_running());
}

#[test]
fn distance_integrates_each_segment() {
    let clock = TestClock::new();
    let (belt, _dir, _pwm) = belt(&clock);
    belt.start(2).unwrap();
    clock.advance(Duration::from_secs(3));
    // still running: 2 * 3 s * 200
    assert_eq!(belt.distance(), 1200.0);
    belt.start(-1).unwrap();
    clock.advance(Duration::from_secs(1));
    belt.stop().unwrap();
    assert_eq!(belt.distance(), 1000.0);
    // stopped belts do not accumulate
    clock.advance(Duration::from_secs(10));
    assert_eq!(belt.distance(), 1000.0);
}

#[test]
fn distance_read_is_side_effect_free() {
    let clock = TestClock::new();
    let (belt, _dir, _pwm) = belt(&clock);
    belt.start(1).unwrap();
    clock.advance(Duration::from_millis(500));
    let a = belt.distance();
    let b = belt.distance();
    assert_eq!(a, b);
    assert_eq!(a, 100.0);
}

proptest! {
    #[test]
    fn dead_reckoning_matches_sum_of_segments(
        segments in prop::collection::vec((-5i8..=5, 0u64..5_000), 1..12)
    ) {
        let clock = TestClock::new();
        let (belt, _dir, _pwm) = belt(&clock);
        let mut expected = 0.0_f64;
        for (speed, ms) in &segments {
            belt.start(*speed).unwrap();
            clock.advance(Duration::from_millis(*ms));
            expected += f64::from(*speed) * (*ms as f64 / 1000.0) * 200.0;
        }
        belt.stop().unwrap();
        let got = belt.distance();
        prop_assert!((got - expected).abs() <= 1e-6 * expected.abs().max(1.0),
            "got {got}, expected {expected}");
    }
}
