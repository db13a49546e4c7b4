pub mod clock;
pub mod vision;

pub use clock::{Clock, MonotonicClock};
pub use vision::{Classification, Classifier, Frame, FrameSource};

/// Error type crossing every hardware/collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
pub type HwResult<T> = Result<T, BoxError>;

/// 8-bit RGB triple as pushed to an addressable LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A single digital output ("set pin high/low").
pub trait OutputLine: Send {
    fn set_high(&mut self) -> HwResult<()>;
    fn set_low(&mut self) -> HwResult<()>;

    fn write(&mut self, high: bool) -> HwResult<()> {
        if high { self.set_high() } else { self.set_low() }
    }
}

/// A pulse-width-modulated output ("set PWM frequency/duty").
pub trait PwmOutput: Send {
    /// `duty_cycle` is a fraction in `0.0..=1.0`.
    fn set_pwm(&mut self, frequency_hz: f64, duty_cycle: f64) -> HwResult<()>;
    /// Stop pulsing and hold the line low.
    fn clear(&mut self) -> HwResult<()>;
}

/// An interrupt-capable input ("register edge-triggered callback").
///
/// The callback runs on the backend's interrupt thread. It must not block.
pub trait EdgeInput: Send {
    fn on_edge(&mut self, callback: Box<dyn FnMut() + Send>) -> HwResult<()>;
}

/// An addressable LED strip ("push N pixel colours").
///
/// `set_pixel` only stages a colour; nothing reaches the LEDs until `show`.
pub trait PixelStrip: Send {
    fn len(&self) -> usize;
    fn set_pixel(&mut self, index: usize, colour: Rgb);
    fn show(&mut self) -> HwResult<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Severity of a status line pushed to the UI; front-ends pick the colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Info,
    Warn,
    Error,
}

/// Notifications pushed to the UI collaborator. All methods default to no-ops.
pub trait StatusSink: Send + Sync {
    fn status(&self, _text: &str, _level: Level) {}
    fn classification(&self, _label: &str, _confidence: f32) {}
    fn latency(&self, _elapsed: std::time::Duration) {}
    fn position(&self, _steps: i32) {}
    fn colour(&self, _rgb: Rgb) {}
}

/// Sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl StatusSink for NullSink {}
