//! `From` implementations bridging `sorter_config` types to `sorter_core` types.

use std::time::Duration;

use sorter_traits::Rgb;

use crate::bins::BinMap;
use crate::config::{BeltCfg, LightsCfg, SortingCfg, SweeperCfg};
use crate::error::SorterError;

// ── BeltCfg ──────────────────────────────────────────────────────────────────

impl From<&sorter_config::BeltCfg> for BeltCfg {
    fn from(c: &sorter_config::BeltCfg) -> Self {
        Self {
            distance_multiplier: c.distance_multiplier,
            frequency_per_speed: c.frequency_per_speed,
            duty_cycle: c.duty_cycle,
            max_speed: c.max_speed,
            default_sort_speed: c.default_sort_speed,
        }
    }
}

// ── SweeperCfg ───────────────────────────────────────────────────────────────

impl From<&sorter_config::SweeperCfg> for SweeperCfg {
    fn from(c: &sorter_config::SweeperCfg) -> Self {
        Self {
            max_position: c.max_position,
            step_half_period: Duration::from_micros(c.step_half_period_us),
            homing_half_period: Duration::from_micros(c.homing_half_period_us),
            homing_backoff_steps: c.homing_backoff_steps,
            home_overtravel_steps: c.home_overtravel_steps,
            debounce: Duration::from_millis(c.debounce_ms),
        }
    }
}

// ── LightsCfg ────────────────────────────────────────────────────────────────

impl From<&sorter_config::LightsCfg> for LightsCfg {
    fn from(c: &sorter_config::LightsCfg) -> Self {
        let [r, g, b] = c.idle_colour;
        Self {
            idle_colour: Rgb::new(r, g, b),
            boot_frames: c.boot_frames,
            boot_hue_step: c.boot_hue_step,
            frame_delay: Duration::from_millis(c.frame_ms),
        }
    }
}

// ── SortingCfg ───────────────────────────────────────────────────────────────

impl From<&sorter_config::SortingCfg> for SortingCfg {
    fn from(c: &sorter_config::SortingCfg) -> Self {
        Self {
            beam_settle: Duration::from_millis(c.beam_settle_ms),
            classify_timeout: Duration::from_millis(c.classify_timeout_ms),
            beam_debounce: Duration::from_millis(c.beam_debounce_ms),
            travel_offset: c.travel_offset,
            poll_interval: Duration::from_millis(c.poll_ms),
        }
    }
}

// ── BinMap ───────────────────────────────────────────────────────────────────

impl TryFrom<&sorter_config::Config> for BinMap {
    type Error = SorterError;

    fn try_from(c: &sorter_config::Config) -> Result<Self, Self::Error> {
        BinMap::new(c.bins.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweeper_periods_become_durations() {
        let src = sorter_config::SweeperCfg {
            step_half_period_us: 250,
            debounce_ms: 30,
            ..Default::default()
        };
        let cfg = SweeperCfg::from(&src);
        assert_eq!(cfg.step_half_period, Duration::from_micros(250));
        assert_eq!(cfg.debounce, Duration::from_millis(30));
        assert_eq!(cfg.max_position, 8000);
    }

    #[test]
    fn idle_colour_array_maps_to_rgb() {
        let src = sorter_config::LightsCfg {
            idle_colour: [1, 2, 3],
            ..Default::default()
        };
        assert_eq!(LightsCfg::from(&src).idle_colour, Rgb::new(1, 2, 3));
    }
}
