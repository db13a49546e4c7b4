#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core sorting logic (hardware-agnostic).
//!
//! This crate drives the conveyor sorter. All hardware interactions go through
//! the `sorter_traits` seams (`OutputLine`, `PwmOutput`, `EdgeInput`,
//! `PixelStrip`, `FrameSource`, `Classifier`).
//!
//! ## Architecture
//!
//! - **Belt**: PWM stepper with dead-reckoned distance (`belt` module)
//! - **Sweeper**: homing and absolute moves against one limit switch (`sweeper` module)
//! - **Lights**: boot animation, fill colour and status pixel (`lights` module)
//! - **Dispatcher**: FIFO of parts waiting for the sweeper (`dispatcher` module)
//! - **Vision**: single-slot classification worker (`vision` module)
//! - **System**: the beam-break sort cycle and manual commands (`system` module)
//!
//! ## Interrupt discipline
//!
//! Edge callbacks (limit switch, beam break) only debounce, flip atomics or
//! push a token onto a bounded channel. All real work happens on worker threads.

use std::sync::Arc;

use sorter_traits::Clock;

pub mod belt;
pub mod bins;
pub mod builder;
pub mod colour;
pub mod config;
pub mod conversions;
pub mod debounce;
pub mod dispatcher;
pub mod error;
pub mod hw_error;
pub mod lights;
pub mod mocks;
pub mod status;
pub mod sweeper;
pub mod system;
pub mod util;
pub mod vision;

/// Clock shared by every drive and worker.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub use belt::{Belt, BeltDrive};
pub use bins::BinMap;
pub use builder::SystemBuilder;
pub use colour::{ColourChange, Hsv};
pub use config::{BeltCfg, LightsCfg, SortingCfg, SweeperCfg};
pub use dispatcher::{SortDispatcher, SortEntry};
pub use error::{BuildError, EmergencyCause, Result, SorterError};
pub use lights::{StatusLights, StripFactory};
pub use status::SystemStatus;
pub use sweeper::{MoveOutcome, Positioner, Sweeper, SweeperPins};
pub use system::SystemController;
pub use vision::{Vision, VisionWorker};
