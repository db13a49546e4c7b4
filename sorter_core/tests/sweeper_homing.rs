//! Sweeper homing, range checks and limit-switch handling against a simulated axis.

use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use sorter_core::{EmergencyCause, MoveOutcome, SorterError, Sweeper, SweeperCfg, SweeperPins};
use sorter_hardware::{SimAxis, SimSwitch};
use sorter_traits::{Clock, MonotonicClock};
use sorter_traits::clock::test_clock::TestClock;

const TRAVEL: i64 = 8_000;

fn sweeper_at(physical: i64, clock: &TestClock) -> (Sweeper, SimAxis) {
    sweeper_with(physical, Arc::new(clock.clone()), SweeperCfg::default())
}

fn sweeper_with(
    physical: i64,
    clock: sorter_core::SharedClock,
    cfg: SweeperCfg,
) -> (Sweeper, SimAxis) {
    let axis = SimAxis::new(physical, TRAVEL);
    let mut switch = axis.limit_switch();
    let sweeper = Sweeper::new(
        SweeperPins {
            direction: Box::new(axis.direction_line()),
            step: Box::new(axis.step_line()),
        },
        &mut switch,
        cfg,
        clock,
    )
    .unwrap();
    (sweeper, axis)
}

#[test]
fn home_finds_the_switch() {
    let clock = TestClock::new();
    let (sweeper, axis) = sweeper_at(3_000, &clock);
    assert!(!sweeper.is_homed());
    assert_eq!(sweeper.home().unwrap(), MoveOutcome::Homed);
    assert!(sweeper.is_homed());
    assert_eq!(sweeper.position(), 0);
    assert_eq!(axis.position(), 0);
    // 20 back-off pulses, then 3020 back to the switch
    assert_eq!(axis.pulses(), 3_040);
}

#[test]
fn homing_twice_is_idempotent() {
    let clock = TestClock::new();
    let (sweeper, axis) = sweeper_at(1_234, &clock);
    sweeper.home().unwrap();
    let first = axis.pulses();
    sweeper.home().unwrap();
    assert!(sweeper.is_homed());
    assert_eq!(sweeper.position(), 0);
    assert_eq!(axis.position(), 0);
    // second pass only backs off and returns
    assert_eq!(axis.pulses() - first, 40);
}

#[test]
fn homing_from_on_the_switch() {
    let clock = TestClock::new();
    let (sweeper, axis) = sweeper_at(0, &clock);
    assert_eq!(sweeper.home().unwrap(), MoveOutcome::Homed);
    assert_eq!(axis.position(), 0);
}

#[test]
fn jammed_homing_fails_and_latches() {
    let clock = TestClock::new();
    let (sweeper, axis) = sweeper_at(500, &clock);
    axis.set_jammed(true);
    let err = sweeper.home().unwrap_err();
    assert_eq!(err, SorterError::EmergencyStop(EmergencyCause::HomingFailed));
    assert!(!sweeper.is_homed());
    assert!(sweeper.emergency_latched());
    // back-off plus the full seek budget
    assert_eq!(axis.pulses(), 20 + 8_000 + 20 + 400);

    axis.set_jammed(false);
    clock.advance(Duration::from_millis(100));
    sweeper.home().unwrap();
    assert!(!sweeper.emergency_latched());
}

#[test]
fn homed_moves_track_position() {
    let clock = TestClock::new();
    let (sweeper, axis) = sweeper_at(10, &clock);
    sweeper.home().unwrap();
    assert_eq!(sweeper.move_absolute(2_000).unwrap(), MoveOutcome::Completed);
    assert_eq!(sweeper.position(), 2_000);
    assert_eq!(axis.position(), 2_000);
    sweeper.move_relative(-500).unwrap();
    assert_eq!(sweeper.position(), 1_500);
    assert_eq!(axis.position(), 1_500);
}

#[test]
fn out_of_range_targets_issue_no_pulses() {
    let clock = TestClock::new();
    let (sweeper, axis) = sweeper_at(0, &clock);
    sweeper.home().unwrap();
    sweeper.move_absolute(100).unwrap();
    let before = axis.pulses();

    let err = sweeper.move_absolute(8_001).unwrap_err();
    assert_eq!(
        err,
        SorterError::OutOfRange {
            target: 8_001,
            max: 8_000
        }
    );
    let err = sweeper.move_relative(-101).unwrap_err();
    assert!(matches!(err, SorterError::OutOfRange { target: -1, .. }));

    assert_eq!(axis.pulses(), before);
    assert_eq!(sweeper.position(), 100);
    assert!(sweeper.is_homed());
}

#[test]
fn max_position_is_reachable() {
    let clock = TestClock::new();
    let (sweeper, _axis) = sweeper_at(0, &clock);
    sweeper.home().unwrap();
    sweeper.move_absolute(8_000).unwrap();
    assert_eq!(sweeper.position(), 8_000);
}

#[test]
fn moving_to_zero_ends_on_the_switch() {
    let clock = TestClock::new();
    let (sweeper, axis) = sweeper_at(0, &clock);
    sweeper.home().unwrap();
    sweeper.move_absolute(1_000).unwrap();
    clock.advance(Duration::from_millis(100));
    let before = axis.pulses();

    assert_eq!(sweeper.move_absolute(0).unwrap(), MoveOutcome::Homed);
    assert_eq!(sweeper.position(), 0);
    assert!(sweeper.is_homed());
    assert!(!sweeper.emergency_latched());
    assert_eq!(axis.pulses() - before, 1_000);
}

#[test]
fn unexpected_switch_during_move_is_an_emergency() {
    let clock = TestClock::new();
    // not homed: the controller believes it is at 0, the carriage is at 30
    let (sweeper, axis) = sweeper_at(30, &clock);
    let err = sweeper.move_relative(-50).unwrap_err();
    assert_eq!(err, SorterError::EmergencyStop(EmergencyCause::UnexpectedLimit));
    assert_eq!(axis.pulses(), 30);
    assert_eq!(sweeper.position(), 0);
    assert!(!sweeper.is_homed());
    assert!(sweeper.emergency_latched());

    // latched until homed again
    let err = sweeper.move_relative(10).unwrap_err();
    assert!(err.is_emergency());
    assert_eq!(axis.pulses(), 30);

    clock.advance(Duration::from_millis(100));
    sweeper.home().unwrap();
    sweeper.move_relative(10).unwrap();
    assert_eq!(sweeper.position(), 10);
}

#[test]
fn idle_trigger_clears_homed() {
    let clock = TestClock::new();
    let (sweeper, axis) = sweeper_at(0, &clock);
    sweeper.home().unwrap();
    sweeper.move_absolute(400).unwrap();

    clock.advance(Duration::from_millis(100));
    axis.limit_switch().trigger();
    assert!(!sweeper.is_homed());
    assert!(sweeper.emergency_latched());
    assert_eq!(
        sweeper.move_absolute(800).unwrap_err(),
        SorterError::EmergencyStop(EmergencyCause::UnexpectedLimit)
    );
}

#[test]
fn switch_bounce_is_debounced() {
    let clock = TestClock::new();
    let (sweeper, axis) = sweeper_at(0, &clock);
    sweeper.home().unwrap();
    // bounce right after the homing contact is swallowed
    axis.limit_switch().trigger();
    assert!(sweeper.is_homed());
    assert!(!sweeper.emergency_latched());
}

/// Chatters the switch twice while the sweeper waits out its debounce.
struct ChatteringClock {
    inner: TestClock,
    switch: OnceLock<SimSwitch>,
    debounce: Duration,
}

impl Clock for ChatteringClock {
    fn now(&self) -> Instant {
        self.inner.now()
    }

    fn sleep(&self, d: Duration) {
        if d == self.debounce
            && let Some(switch) = self.switch.get()
        {
            switch.trigger();
            self.inner.advance(self.debounce * 2);
            switch.trigger();
        }
        self.inner.sleep(d);
    }
}

#[test]
fn chatter_while_settling_does_not_latch_emergency() {
    let cfg = SweeperCfg::default();
    let clock = Arc::new(ChatteringClock {
        inner: TestClock::new(),
        switch: OnceLock::new(),
        debounce: cfg.debounce,
    });
    let (sweeper, axis) = sweeper_with(3_000, clock.clone(), cfg);
    let _ = clock.switch.set(axis.limit_switch());

    assert_eq!(sweeper.home().unwrap(), MoveOutcome::Homed);
    // two chatter edges, then the seek arriving home
    assert_eq!(axis.limit_switch().edges(), 3);
    assert!(sweeper.is_homed());
    assert!(!sweeper.emergency_latched());
    assert_eq!(sweeper.move_absolute(400).unwrap(), MoveOutcome::Completed);
    assert_eq!(axis.position(), 400);
}

#[test]
fn concurrent_move_is_rejected() {
    let cfg = SweeperCfg {
        step_half_period: Duration::from_micros(200),
        ..SweeperCfg::default()
    };
    let (sweeper, axis) = sweeper_with(4_000, Arc::new(MonotonicClock::new()), cfg);
    let sweeper = Arc::new(sweeper);

    let mover = {
        let sweeper = Arc::clone(&sweeper);
        thread::spawn(move || sweeper.move_relative(500))
    };
    let deadline = Instant::now() + Duration::from_secs(2);
    while !sweeper.is_moving() && Instant::now() < deadline {
        thread::yield_now();
    }
    assert!(sweeper.is_moving());
    assert_eq!(sweeper.move_relative(100).unwrap_err(), SorterError::MoveInProgress);
    assert_eq!(sweeper.home().unwrap_err(), SorterError::MoveInProgress);

    assert_eq!(mover.join().unwrap().unwrap(), MoveOutcome::Completed);
    assert_eq!(sweeper.position(), 500);
    assert_eq!(axis.pulses(), 500);
    assert!(!sweeper.is_moving());
}
