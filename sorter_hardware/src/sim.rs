//! Simulated hardware used off-device and by the test suites.
//!
//! Every shim is a cheap `Clone` handle over shared state, so a test can hand one
//! clone to the drive under test and keep another to inspect what was written.
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sorter_traits::{
    Classification, Classifier, EdgeInput, Frame, FrameSource, HwResult, OutputLine, PixelStrip,
    PwmOutput, Rgb,
};

use crate::error::HwError;

type Callback = Box<dyn FnMut() + Send>;

/// Recording digital output.
#[derive(Clone, Default)]
pub struct SimLine {
    level: Arc<AtomicBool>,
    rising: Arc<AtomicU64>,
}

impl SimLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    /// Number of low-to-high transitions seen so far.
    pub fn rising_edges(&self) -> u64 {
        self.rising.load(Ordering::Acquire)
    }
}

impl OutputLine for SimLine {
    fn set_high(&mut self) -> HwResult<()> {
        if !self.level.swap(true, Ordering::AcqRel) {
            self.rising.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    fn set_low(&mut self) -> HwResult<()> {
        self.level.store(false, Ordering::Release);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PwmState {
    frequency_hz: f64,
    duty_cycle: f64,
    running: bool,
}

/// Recording PWM output.
#[derive(Clone, Default)]
pub struct SimPwm {
    state: Arc<Mutex<PwmState>>,
}

impl SimPwm {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> PwmState {
        self.state.lock().map(|s| *s).unwrap_or_default()
    }

    pub fn frequency_hz(&self) -> f64 {
        self.snapshot().frequency_hz
    }

    pub fn duty_cycle(&self) -> f64 {
        self.snapshot().duty_cycle
    }

    pub fn is_running(&self) -> bool {
        self.snapshot().running
    }
}

impl PwmOutput for SimPwm {
    fn set_pwm(&mut self, frequency_hz: f64, duty_cycle: f64) -> HwResult<()> {
        let mut s = self.state.lock().map_err(|_| HwError::Gpio("pwm poisoned".into()))?;
        s.frequency_hz = frequency_hz;
        s.duty_cycle = duty_cycle;
        s.running = duty_cycle > 0.0;
        Ok(())
    }

    fn clear(&mut self) -> HwResult<()> {
        let mut s = self.state.lock().map_err(|_| HwError::Gpio("pwm poisoned".into()))?;
        s.duty_cycle = 0.0;
        s.running = false;
        Ok(())
    }
}

#[derive(Default)]
struct StripState {
    staged: Vec<Rgb>,
    shown: Vec<Rgb>,
    shows: u64,
}

/// Recording addressable strip. `shown()` reflects the last `show()`.
#[derive(Clone)]
pub struct SimStrip {
    state: Arc<Mutex<StripState>>,
    len: usize,
}

impl SimStrip {
    pub fn new(len: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(StripState {
                staged: vec![Rgb::OFF; len],
                shown: vec![Rgb::OFF; len],
                shows: 0,
            })),
            len,
        }
    }

    pub fn shown(&self) -> Vec<Rgb> {
        self.state.lock().map(|s| s.shown.clone()).unwrap_or_default()
    }

    pub fn shows(&self) -> u64 {
        self.state.lock().map(|s| s.shows).unwrap_or(0)
    }
}

impl PixelStrip for SimStrip {
    fn len(&self) -> usize {
        self.len
    }

    fn set_pixel(&mut self, index: usize, colour: Rgb) {
        if let Ok(mut s) = self.state.lock()
            && let Some(px) = s.staged.get_mut(index)
        {
            *px = colour;
        }
    }

    fn show(&mut self) -> HwResult<()> {
        let mut s = self.state.lock().map_err(|_| HwError::Spi("strip poisoned".into()))?;
        s.shown = s.staged.clone();
        s.shows += 1;
        Ok(())
    }
}

/// Edge input fired by hand (`trigger`), or by a `SimAxis` reaching home.
#[derive(Clone, Default)]
pub struct SimSwitch {
    callback: Arc<Mutex<Option<Callback>>>,
    fired: Arc<AtomicU64>,
}

/// A beam-break sensor is just a switch the test presses.
pub type SimBeam = SimSwitch;

impl SimSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one edge to the registered callback, if any.
    pub fn trigger(&self) {
        self.fired.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut slot) = self.callback.lock()
            && let Some(cb) = slot.as_mut()
        {
            cb();
        }
    }

    pub fn edges(&self) -> u64 {
        self.fired.load(Ordering::Acquire)
    }
}

impl EdgeInput for SimSwitch {
    fn on_edge(&mut self, callback: Box<dyn FnMut() + Send>) -> HwResult<()> {
        let mut slot = self
            .callback
            .lock()
            .map_err(|_| HwError::Gpio("switch poisoned".into()))?;
        *slot = Some(callback);
        Ok(())
    }
}

#[derive(Debug)]
struct AxisState {
    position: i64,
    travel: i64,
    toward_home: bool,
    pulses: u64,
    jammed: bool,
}

/// A simulated linear axis: direction + step inputs, and a home switch at 0.
///
/// Direction high moves toward home. The carriage cannot pass either end; the
/// switch fires once each time the carriage arrives at 0.
#[derive(Clone)]
pub struct SimAxis {
    state: Arc<Mutex<AxisState>>,
    switch: SimSwitch,
}

impl SimAxis {
    pub fn new(position: i64, travel: i64) -> Self {
        Self {
            state: Arc::new(Mutex::new(AxisState {
                position: position.clamp(0, travel),
                travel,
                toward_home: false,
                pulses: 0,
                jammed: false,
            })),
            switch: SimSwitch::new(),
        }
    }

    pub fn direction_line(&self) -> SimAxisDirection {
        SimAxisDirection { axis: self.clone() }
    }

    pub fn step_line(&self) -> SimAxisStep {
        SimAxisStep {
            axis: self.clone(),
            level: false,
        }
    }

    pub fn limit_switch(&self) -> SimSwitch {
        self.switch.clone()
    }

    pub fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position).unwrap_or(0)
    }

    pub fn pulses(&self) -> u64 {
        self.state.lock().map(|s| s.pulses).unwrap_or(0)
    }

    /// A jammed axis counts pulses but the carriage does not move.
    pub fn set_jammed(&self, jammed: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.jammed = jammed;
        }
    }

    fn step(&self) {
        let arrived_home = {
            let Ok(mut s) = self.state.lock() else {
                return;
            };
            s.pulses += 1;
            if s.jammed {
                false
            } else {
                let before = s.position;
                let delta = if s.toward_home { -1 } else { 1 };
                s.position = (s.position + delta).clamp(0, s.travel);
                before > 0 && s.position == 0
            }
        };
        if arrived_home {
            self.switch.trigger();
        }
    }
}

pub struct SimAxisDirection {
    axis: SimAxis,
}

impl OutputLine for SimAxisDirection {
    fn set_high(&mut self) -> HwResult<()> {
        if let Ok(mut s) = self.axis.state.lock() {
            s.toward_home = true;
        }
        Ok(())
    }

    fn set_low(&mut self) -> HwResult<()> {
        if let Ok(mut s) = self.axis.state.lock() {
            s.toward_home = false;
        }
        Ok(())
    }
}

pub struct SimAxisStep {
    axis: SimAxis,
    level: bool,
}

impl OutputLine for SimAxisStep {
    fn set_high(&mut self) -> HwResult<()> {
        if !self.level {
            self.level = true;
            self.axis.step();
        }
        Ok(())
    }

    fn set_low(&mut self) -> HwResult<()> {
        self.level = false;
        Ok(())
    }
}

/// Camera stand-in producing blank frames.
#[derive(Clone)]
pub struct SimCamera {
    width: u32,
    height: u32,
    captures: Arc<AtomicUsize>,
}

impl SimCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::Acquire)
    }
}

impl FrameSource for SimCamera {
    fn capture(&mut self) -> HwResult<Frame> {
        self.captures.fetch_add(1, Ordering::AcqRel);
        let len = (self.width as usize) * (self.height as usize) * 3;
        Ok(Frame::new(self.width, self.height, vec![0; len]))
    }
}

/// Classifier that cycles through a fixed script of `(label, confidence)`.
#[derive(Clone)]
pub struct ScriptedClassifier {
    script: Arc<Vec<(String, f32)>>,
    calls: Arc<AtomicUsize>,
    latency: Duration,
}

impl ScriptedClassifier {
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            script: Arc::new(script.into_iter().map(|(l, c)| (l.into(), c)).collect()),
            calls: Arc::new(AtomicUsize::new(0)),
            latency: Duration::ZERO,
        }
    }

    /// Make every classification take at least `latency` of wall-clock time.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&mut self, _frame: &Frame) -> HwResult<Classification> {
        let n = self.calls.fetch_add(1, Ordering::AcqRel);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let Some((label, confidence)) = self.script.get(n % self.script.len().max(1)) else {
            return Err(Box::new(HwError::Injected("empty classifier script")));
        };
        tracing::trace!(label = %label, confidence, "scripted classification");
        Ok(Classification {
            label: label.clone(),
            confidence: *confidence,
            crop: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_fires_switch_once_on_arrival() {
        let axis = SimAxis::new(3, 100);
        let mut switch = axis.limit_switch();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_cb = hits.clone();
        switch
            .on_edge(Box::new(move || {
                hits_cb.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();

        let mut dir = axis.direction_line();
        let mut step = axis.step_line();
        dir.set_high().unwrap();
        for _ in 0..6 {
            step.set_high().unwrap();
            step.set_low().unwrap();
        }
        assert_eq!(axis.position(), 0);
        assert_eq!(axis.pulses(), 6);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn jammed_axis_never_reaches_home() {
        let axis = SimAxis::new(2, 100);
        axis.set_jammed(true);
        let mut dir = axis.direction_line();
        let mut step = axis.step_line();
        dir.set_high().unwrap();
        for _ in 0..10 {
            step.set_high().unwrap();
            step.set_low().unwrap();
        }
        assert_eq!(axis.position(), 2);
        assert_eq!(axis.limit_switch().edges(), 0);
    }

    #[test]
    fn strip_only_publishes_on_show() {
        let mut strip = SimStrip::new(3);
        strip.set_pixel(1, Rgb::new(1, 2, 3));
        assert_eq!(strip.shown()[1], Rgb::OFF);
        strip.show().unwrap();
        assert_eq!(strip.shown()[1], Rgb::new(1, 2, 3));
        assert_eq!(strip.shows(), 1);
    }

    #[test]
    fn scripted_classifier_cycles() {
        let mut c = ScriptedClassifier::new([("resistor", 91.0), ("diode", 77.0)]);
        let f = Frame::default();
        assert_eq!(c.classify(&f).unwrap().label, "resistor");
        assert_eq!(c.classify(&f).unwrap().label, "diode");
        assert_eq!(c.classify(&f).unwrap().label, "resistor");
        assert_eq!(c.calls(), 3);
    }
}
