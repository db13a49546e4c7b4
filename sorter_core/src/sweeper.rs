//! Sweeper stepper: homing against a single limit switch and absolute moves.
//!
//! The limit switch is both the home reference and the emergency stop. Its
//! interrupt callback only flips atomics; the pulsing loop polls them before
//! every step and ends the move itself.
//!
//! Two one-shot expectations tell the callback what a trigger means:
//! - `expecting_manual_stop`: a planned contact (backing off the switch), ignore it
//! - `expecting_home`: the move is seeking the switch, end it as "homed"
//!
//! Any other trigger is an emergency: position is zeroed and `homed` cleared
//! until the next successful `home()`.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sorter_traits::{EdgeInput, OutputLine};

use crate::SharedClock;
use crate::config::SweeperCfg;
use crate::debounce::Debouncer;
use crate::error::{EmergencyCause, Result, SorterError};
use crate::hw_error::hw;

/// Pins driving the sweeper stepper. Direction high moves toward home.
pub struct SweeperPins {
    pub direction: Box<dyn OutputLine>,
    pub step: Box<dyn OutputLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// All requested steps were issued.
    Completed,
    /// The move ended on the home switch.
    Homed,
}

const SIGNAL_NONE: u8 = 0;
const SIGNAL_HOME: u8 = 1;
const SIGNAL_EMERGENCY: u8 = 2;

/// State shared with the limit-switch callback.
#[derive(Default)]
struct LimitFlags {
    expecting_home: AtomicBool,
    expecting_manual_stop: AtomicBool,
    signal: AtomicU8,
    homed: AtomicBool,
    moving: AtomicBool,
    emergency: AtomicBool,
}

impl LimitFlags {
    fn on_trigger(&self) {
        if self.expecting_manual_stop.swap(false, Ordering::AcqRel) {
            return;
        }
        if self.expecting_home.swap(false, Ordering::AcqRel) {
            self.signal.store(SIGNAL_HOME, Ordering::Release);
            return;
        }
        self.homed.store(false, Ordering::Release);
        self.emergency.store(true, Ordering::Release);
        self.signal.store(SIGNAL_EMERGENCY, Ordering::Release);
    }

    fn take_signal(&self) -> u8 {
        self.signal.swap(SIGNAL_NONE, Ordering::AcqRel)
    }
}

/// Clears the moving flag and any unconsumed expectation when a move ends.
struct MoveGuard<'a> {
    flags: &'a LimitFlags,
}

impl Drop for MoveGuard<'_> {
    fn drop(&mut self) {
        self.flags.expecting_home.store(false, Ordering::Release);
        self.flags.expecting_manual_stop.store(false, Ordering::Release);
        self.flags.moving.store(false, Ordering::Release);
    }
}

pub struct Sweeper {
    pins: Mutex<SweeperPins>,
    flags: Arc<LimitFlags>,
    position: AtomicI32,
    cfg: SweeperCfg,
    clock: SharedClock,
}

impl Sweeper {
    /// Registers the debounced limit-switch callback on `limit`.
    pub fn new(
        pins: SweeperPins,
        limit: &mut dyn EdgeInput,
        cfg: SweeperCfg,
        clock: SharedClock,
    ) -> Result<Self> {
        let flags = Arc::new(LimitFlags::default());
        let debouncer = Debouncer::new(clock.clone(), cfg.debounce);
        let cb_flags = Arc::clone(&flags);
        limit
            .on_edge(Box::new(move || {
                if debouncer.accept() {
                    cb_flags.on_trigger();
                }
            }))
            .map_err(hw)?;

        Ok(Self {
            pins: Mutex::new(pins),
            flags,
            position: AtomicI32::new(0),
            cfg,
            clock,
        })
    }

    pub fn position(&self) -> i32 {
        self.position.load(Ordering::Acquire)
    }

    pub fn is_homed(&self) -> bool {
        self.flags.homed.load(Ordering::Acquire)
    }

    pub fn is_moving(&self) -> bool {
        self.flags.moving.load(Ordering::Acquire)
    }

    /// Set by an unexpected trigger or a failed homing; cleared by `home()`.
    pub fn emergency_latched(&self) -> bool {
        self.flags.emergency.load(Ordering::Acquire)
    }

    pub fn max_position(&self) -> i32 {
        self.cfg.max_position
    }

    fn begin_move(&self) -> Result<MoveGuard<'_>> {
        self.flags
            .moving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SorterError::MoveInProgress)?;
        // a trigger that landed while idle has already been handled
        self.flags.take_signal();
        Ok(MoveGuard { flags: &self.flags })
    }

    /// Back off the switch, then seek it at homing speed.
    ///
    /// Clears a latched emergency. Fails with `HomingFailed` if the switch is
    /// not seen within `max_position + backoff + overtravel` steps.
    pub fn home(&self) -> Result<MoveOutcome> {
        let _guard = self.begin_move()?;
        self.flags.emergency.store(false, Ordering::Release);
        self.flags.homed.store(false, Ordering::Release);
        tracing::info!("homing sweeper");

        let backoff = self.cfg.homing_backoff_steps.max(0).unsigned_abs();
        // contact until the seek starts is the switch releasing; the guard
        // clears the expectation if the back-off fails
        self.flags.expecting_manual_stop.store(true, Ordering::Release);
        if backoff > 0
            && let Err(e) = self.pulse(false, backoff, self.cfg.homing_half_period)
        {
            return Err(self.fail(e));
        }
        // let the switch settle before the seek can trigger it again
        self.clock.sleep(self.cfg.debounce);
        self.flags.expecting_manual_stop.store(false, Ordering::Release);
        // a bounce after the planned contact was consumed is not a crash
        self.flags.emergency.store(false, Ordering::Release);
        self.flags.take_signal();

        let budget = self.cfg.max_position.max(0).unsigned_abs()
            + backoff
            + self.cfg.home_overtravel_steps.max(0).unsigned_abs();
        self.seek_home(budget, self.cfg.homing_half_period)
    }

    /// Move by `steps` (negative is toward home).
    ///
    /// When homed, a destination outside `[0, max_position]` is rejected with
    /// `OutOfRange` before any pulse. A destination of exactly 0 is reached by
    /// seeking the switch, allowing `home_overtravel_steps` extra.
    pub fn move_relative(&self, steps: i32) -> Result<MoveOutcome> {
        let _guard = self.begin_move()?;
        if self.emergency_latched() {
            return Err(SorterError::EmergencyStop(EmergencyCause::UnexpectedLimit));
        }
        if steps == 0 {
            return Ok(MoveOutcome::Completed);
        }

        if self.is_homed() {
            let max = self.cfg.max_position;
            let target = i64::from(self.position()) + i64::from(steps);
            if target < 0 || target > i64::from(max) {
                tracing::warn!(target, max, "sweeper move rejected");
                return Err(SorterError::OutOfRange { target, max });
            }
            if target == 0 {
                let budget =
                    steps.unsigned_abs() + self.cfg.home_overtravel_steps.max(0).unsigned_abs();
                return self.seek_home(budget, self.cfg.step_half_period);
            }
        }

        let outcome = self.pulse(steps < 0, steps.unsigned_abs(), self.cfg.step_half_period);
        match &outcome {
            Ok(_) => tracing::debug!(steps, position = self.position(), "sweeper moved"),
            Err(e) => tracing::error!(error = %e, steps, "sweeper move aborted"),
        }
        outcome
    }

    /// Move to an absolute step position.
    pub fn move_absolute(&self, target: i32) -> Result<MoveOutcome> {
        self.move_relative(target.saturating_sub(self.position()))
    }

    fn seek_home(&self, budget: u32, half: Duration) -> Result<MoveOutcome> {
        self.flags.expecting_home.store(true, Ordering::Release);
        match self.pulse(true, budget, half) {
            Ok(MoveOutcome::Homed) => {
                tracing::info!("sweeper homed");
                Ok(MoveOutcome::Homed)
            }
            Ok(MoveOutcome::Completed) => {
                tracing::error!(budget, "home switch never triggered");
                Err(self.fail(SorterError::EmergencyStop(EmergencyCause::HomingFailed)))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&self, e: SorterError) -> SorterError {
        self.flags.homed.store(false, Ordering::Release);
        if e.is_emergency() {
            self.flags.emergency.store(true, Ordering::Release);
            self.position.store(0, Ordering::Release);
        }
        e
    }

    /// Issue up to `count` pulses, stopping early on a limit signal.
    fn pulse(&self, toward_home: bool, count: u32, half: Duration) -> Result<MoveOutcome> {
        let mut pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);
        pins.direction.write(toward_home).map_err(hw)?;
        let delta = if toward_home { -1 } else { 1 };

        for _ in 0..count {
            if let Some(outcome) = self.check_signal()? {
                return Ok(outcome);
            }
            pins.step.set_high().map_err(hw)?;
            self.clock.sleep(half);
            pins.step.set_low().map_err(hw)?;
            self.clock.sleep(half);
            self.position.fetch_add(delta, Ordering::AcqRel);
        }
        // the switch can close on the very last pulse
        Ok(self.check_signal()?.unwrap_or(MoveOutcome::Completed))
    }

    fn check_signal(&self) -> Result<Option<MoveOutcome>> {
        match self.flags.take_signal() {
            SIGNAL_HOME => {
                self.position.store(0, Ordering::Release);
                self.flags.homed.store(true, Ordering::Release);
                Ok(Some(MoveOutcome::Homed))
            }
            SIGNAL_EMERGENCY => {
                self.position.store(0, Ordering::Release);
                tracing::error!("limit switch hit unexpectedly, emergency stop");
                Err(SorterError::EmergencyStop(EmergencyCause::UnexpectedLimit))
            }
            _ => Ok(None),
        }
    }
}

/// Something that can park the sweeper over a bin.
pub trait Positioner: Send + Sync {
    fn move_to(&self, target: i32) -> Result<MoveOutcome>;
    fn position(&self) -> i32;
}

impl Positioner for Sweeper {
    fn move_to(&self, target: i32) -> Result<MoveOutcome> {
        self.move_absolute(target)
    }

    fn position(&self) -> i32 {
        Sweeper::position(self)
    }
}
