//! Conveyor belt drive with dead-reckoned distance.
//!
//! The belt has no encoder. Distance is integrated as
//! `sum(speed * segment_seconds) * distance_multiplier`, folding the running
//! segment into the stored total every time the speed changes.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use sorter_traits::{HwResult, OutputLine, PwmOutput};

use crate::SharedClock;
use crate::config::BeltCfg;
use crate::error::{Result, SorterError};
use crate::hw_error::hw;

/// Pins driving the belt stepper.
pub struct BeltDrive {
    pub direction: Box<dyn OutputLine>,
    pub pwm: Box<dyn PwmOutput>,
}

struct Inner {
    drive: BeltDrive,
    speed: i8,
    stored: f64,
    segment_start: Instant,
}

impl Inner {
    fn fold(&mut self, now: Instant, k: f64) {
        if self.speed != 0 {
            let secs = now.saturating_duration_since(self.segment_start).as_secs_f64();
            self.stored += f64::from(self.speed) * secs * k;
        }
        self.segment_start = now;
    }

    fn drive(&mut self, forward: bool, frequency: f64, duty: f64) -> HwResult<()> {
        self.drive.direction.write(forward)?;
        self.drive.pwm.set_pwm(frequency, duty)
    }
}

pub struct Belt {
    inner: Mutex<Inner>,
    cfg: BeltCfg,
    clock: SharedClock,
}

impl Belt {
    pub fn new(drive: BeltDrive, cfg: BeltCfg, clock: SharedClock) -> Self {
        let now = clock.now();
        Self {
            inner: Mutex::new(Inner {
                drive,
                speed: 0,
                stored: 0.0,
                segment_start: now,
            }),
            cfg,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run at `speed` (sign is direction). Zero stops the belt.
    pub fn start(&self, speed: i8) -> Result<()> {
        if speed == 0 {
            return self.stop();
        }
        let max = self.cfg.max_speed;
        if speed.unsigned_abs() > max.unsigned_abs() {
            return Err(SorterError::InvalidSpeed { speed, max });
        }

        let mut inner = self.lock();
        inner.fold(self.clock.now(), self.cfg.distance_multiplier);
        let frequency = f64::from(speed.unsigned_abs()) * self.cfg.frequency_per_speed;
        match inner.drive(speed > 0, frequency, self.cfg.duty_cycle) {
            Ok(()) => {
                inner.speed = speed;
                tracing::debug!(speed, frequency, "belt running");
                Ok(())
            }
            Err(e) => {
                // state unknown; assume it stopped
                inner.speed = 0;
                let _ = inner.drive.pwm.clear();
                Err(hw(e))
            }
        }
    }

    /// Fold the final segment and hold the drive output at zero.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.fold(self.clock.now(), self.cfg.distance_multiplier);
        let was = inner.speed;
        inner.speed = 0;
        inner.drive.pwm.clear().map_err(hw)?;
        if was != 0 {
            tracing::debug!(distance = inner.stored, "belt stopped");
        }
        Ok(())
    }

    /// Current dead-reckoned distance. Does not mutate state.
    pub fn distance(&self) -> f64 {
        let inner = self.lock();
        let secs = self.clock.secs_since(inner.segment_start);
        inner.stored + f64::from(inner.speed) * secs * self.cfg.distance_multiplier
    }

    pub fn speed(&self) -> i8 {
        self.lock().speed
    }

    pub fn is_running(&self) -> bool {
        self.speed() != 0
    }

    pub fn distance_multiplier(&self) -> f64 {
        self.cfg.distance_multiplier
    }

    pub fn default_sort_speed(&self) -> i8 {
        self.cfg.default_sort_speed
    }

    pub fn max_speed(&self) -> i8 {
        self.cfg.max_speed
    }
}
