//! Status sink that renders notifications as console lines.

use std::io::Write;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use sorter_traits::{Level, Rgb, StatusSink};

pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn line(&self, text: std::fmt::Arguments<'_>) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush()) {
            tracing::debug!(error = %e, "console write failed");
        }
    }
}

fn tag(level: Level) -> &'static str {
    match level {
        Level::Ok => "ok",
        Level::Info => "info",
        Level::Warn => "warn",
        Level::Error => "error",
    }
}

impl StatusSink for ConsoleSink {
    fn status(&self, text: &str, level: Level) {
        self.line(format_args!("[{}] {text}", tag(level)));
    }

    fn classification(&self, label: &str, confidence: f32) {
        self.line(format_args!("classified: {label} ({confidence:.1}%)"));
    }

    fn latency(&self, elapsed: Duration) {
        self.line(format_args!("latency: {} ms", elapsed.as_millis()));
    }

    fn position(&self, steps: i32) {
        self.line(format_args!("position: {steps}"));
    }

    fn colour(&self, rgb: Rgb) {
        self.line(format_args!("colour: #{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b));
    }
}
