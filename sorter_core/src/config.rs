//! Configuration types for the sorter drives.
//!
//! These are the runtime configuration structs used by the drives and the
//! controller. They are separate from the TOML-deserialized config in `sorter_config`.

use std::time::Duration;

use sorter_traits::Rgb;

/// Belt drive configuration.
#[derive(Debug, Clone, Copy)]
pub struct BeltCfg {
    /// Distance units travelled per second per unit of speed (K).
    pub distance_multiplier: f64,
    /// PWM step frequency per unit of speed.
    pub frequency_per_speed: f64,
    /// Fixed PWM duty fraction while running.
    pub duty_cycle: f64,
    /// Largest accepted `|speed|`.
    pub max_speed: i8,
    /// Speed used to carry parts during a sort cycle.
    pub default_sort_speed: i8,
}

impl Default for BeltCfg {
    fn default() -> Self {
        Self {
            distance_multiplier: 200.0,
            frequency_per_speed: 200.0,
            duty_cycle: 0.5,
            max_speed: 5,
            default_sort_speed: 3,
        }
    }
}

/// Sweeper stepper configuration.
#[derive(Debug, Clone, Copy)]
pub struct SweeperCfg {
    /// Far end of travel in steps (home is 0).
    pub max_position: i32,
    /// Half period of a step pulse during ordinary moves.
    pub step_half_period: Duration,
    /// Half period of a step pulse while homing.
    pub homing_half_period: Duration,
    /// Steps taken away from the switch before seeking it.
    pub homing_backoff_steps: i32,
    /// Extra steps allowed past the nominal target when seeking home.
    pub home_overtravel_steps: i32,
    /// Limit-switch bounce window.
    pub debounce: Duration,
}

impl Default for SweeperCfg {
    fn default() -> Self {
        Self {
            max_position: 8000,
            step_half_period: Duration::from_micros(100),
            homing_half_period: Duration::from_micros(1000),
            homing_backoff_steps: 20,
            home_overtravel_steps: 400,
            debounce: Duration::from_millis(50),
        }
    }
}

/// Status light configuration. The strip length comes from the strip itself.
#[derive(Debug, Clone, Copy)]
pub struct LightsCfg {
    /// Fill colour after the boot animation.
    pub idle_colour: Rgb,
    pub boot_frames: u32,
    /// Hue advance per boot frame, in 0..256 wheel units.
    pub boot_hue_step: f32,
    pub frame_delay: Duration,
}

impl Default for LightsCfg {
    fn default() -> Self {
        Self {
            idle_colour: Rgb::new(255, 197, 143),
            boot_frames: 128,
            boot_hue_step: 5.0,
            frame_delay: Duration::from_millis(20),
        }
    }
}

/// Sort cycle timing.
#[derive(Debug, Clone, Copy)]
pub struct SortingCfg {
    /// Wait after a beam break so the part reaches the camera.
    pub beam_settle: Duration,
    /// Longest wait for a classification before the part is refused.
    pub classify_timeout: Duration,
    pub beam_debounce: Duration,
    /// Extra belt travel added to a manual sort's run time.
    pub travel_offset: f64,
    /// Poll interval while waiting out a manual sort's belt run.
    pub poll_interval: Duration,
}

impl Default for SortingCfg {
    fn default() -> Self {
        Self {
            beam_settle: Duration::from_millis(500),
            classify_timeout: Duration::from_millis(5000),
            beam_debounce: Duration::from_millis(50),
            travel_offset: 10_000.0,
            poll_interval: Duration::from_millis(200),
        }
    }
}
