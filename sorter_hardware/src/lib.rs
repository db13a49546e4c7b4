//! Hardware backends for the sorter.
//!
//! The `sim` module is always available and backs the default (simulated) build
//! and the test suites. Real Raspberry Pi backends (`rppal` GPIO/PWM/interrupts and
//! a WS2812 strip driven over SPI) are enabled by the `hardware` feature.
pub mod error;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod ws2812;

#[cfg(all(feature = "rt", target_os = "linux"))]
pub mod rt;

pub use error::HwError;
pub use sim::{
    ScriptedClassifier, SimAxis, SimBeam, SimCamera, SimLine, SimPwm, SimStrip, SimSwitch,
};
