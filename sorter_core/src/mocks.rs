//! Test and helper mocks for sorter_core

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use sorter_traits::{Classification, Level, Rgb, StatusSink};

use crate::error::{Result, SorterError};
use crate::sweeper::{MoveOutcome, Positioner};
use crate::vision::Vision;

/// Vision that always answers with the same label and counts its calls.
pub struct FixedVision {
    label: String,
    confidence: f32,
    calls: AtomicUsize,
}

impl FixedVision {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

impl Vision for FixedVision {
    fn classify(&self, _timeout: Duration) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        Ok(Classification {
            label: self.label.clone(),
            confidence: self.confidence,
            crop: None,
        })
    }
}

/// Vision whose classifier never answers in time.
#[derive(Default)]
pub struct SilentVision {
    calls: AtomicUsize,
}

impl SilentVision {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

impl Vision for SilentVision {
    fn classify(&self, _timeout: Duration) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        Err(SorterError::Timeout)
    }
}

/// Positioner that records targets and holds each move until released.
pub struct GatedPositioner {
    targets: Mutex<Vec<i32>>,
    open: Mutex<bool>,
    opened: Condvar,
    position: AtomicI32,
}

impl GatedPositioner {
    /// `open = false` makes every move wait for `release()`.
    pub fn new(open: bool) -> Self {
        Self {
            targets: Mutex::new(Vec::new()),
            open: Mutex::new(open),
            opened: Condvar::new(),
            position: AtomicI32::new(0),
        }
    }

    pub fn release(&self) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.opened.notify_all();
    }

    /// Targets in the order their moves started.
    pub fn targets(&self) -> Vec<i32> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Positioner for GatedPositioner {
    fn move_to(&self, target: i32) -> Result<MoveOutcome> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target);
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        while !*open {
            open = self.opened.wait(open).unwrap_or_else(PoisonError::into_inner);
        }
        self.position.store(target, Ordering::Release);
        Ok(MoveOutcome::Completed)
    }

    fn position(&self) -> i32 {
        self.position.load(Ordering::Acquire)
    }
}

/// Sink that keeps every notification as a line of text.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }
}

impl StatusSink for RecordingSink {
    fn status(&self, text: &str, level: Level) {
        self.push(format!("status {level:?}: {text}"));
    }

    fn classification(&self, label: &str, confidence: f32) {
        self.push(format!("classification: {label} {confidence:.1}"));
    }

    fn latency(&self, elapsed: Duration) {
        self.push(format!("latency: {} ms", elapsed.as_millis()));
    }

    fn position(&self, steps: i32) {
        self.push(format!("position: {steps}"));
    }

    fn colour(&self, rgb: Rgb) {
        self.push(format!("colour: {} {} {}", rgb.r, rgb.g, rgb.b));
    }
}
