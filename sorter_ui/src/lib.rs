#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Line-oriented operator console: command parsing and status rendering.
//!
//! Commands mirror the operator panel (enable, speed, colour sliders, home,
//! manual move and sort). Notifications arrive through `sorter_traits::StatusSink`.

pub mod command;
pub mod sink;

pub use command::{UiCommand, parse_line};
pub use sink::ConsoleSink;
