//! Hardware assembly: simulated drives by default, Raspberry Pi pins with `hardware`.

use std::sync::Arc;

use eyre::WrapErr;
use sorter_config::Config;
use sorter_core::{BeltDrive, SweeperPins, SystemBuilder, SystemController, VisionWorker};
use sorter_hardware::{ScriptedClassifier, SimCamera};
use sorter_traits::StatusSink;

/// Classifier script for the simulated vision link, `label:confidence,...`.
const SIM_LABELS_ENV: &str = "SORTER_SIM_LABELS";
/// Starting carriage position of the simulated sweeper axis.
const SIM_AXIS_START_ENV: &str = "SORTER_SIM_AXIS_START";

/// Build the controller for `cfg`. Workers are running when this returns.
pub fn assemble(cfg: &Config, sink: Arc<dyn StatusSink>) -> eyre::Result<Arc<SystemController>> {
    let builder = SystemController::builder()
        .apply_config(cfg)?
        .with_sink(sink)
        .with_vision(Arc::new(vision(cfg)?));
    with_drives(builder, cfg)?
        .try_build()
        .wrap_err("assemble sorter")
}

/// The classifier is an external collaborator; locally it is scripted.
fn vision(cfg: &Config) -> eyre::Result<VisionWorker> {
    let script = std::env::var(SIM_LABELS_ENV)
        .ok()
        .map(|s| parse_script(&s))
        .transpose()?
        .unwrap_or_else(|| vec![("resistor".to_string(), 90.0)]);
    let camera = SimCamera::new(cfg.hardware.camera_width, cfg.hardware.camera_height);
    Ok(VisionWorker::spawn(
        Box::new(camera),
        Box::new(ScriptedClassifier::new(script)),
    )?)
}

pub fn parse_script(s: &str) -> eyre::Result<Vec<(String, f32)>> {
    s.split(',')
        .filter(|item| !item.trim().is_empty())
        .map(|item| {
            let (label, conf) = item
                .split_once(':')
                .ok_or_else(|| eyre::eyre!("{SIM_LABELS_ENV}: expected label:confidence, got {item:?}"))?;
            let conf: f32 = conf
                .trim()
                .parse()
                .wrap_err_with(|| format!("{SIM_LABELS_ENV}: bad confidence in {item:?}"))?;
            Ok((label.trim().to_string(), conf))
        })
        .collect()
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn with_drives(builder: SystemBuilder, cfg: &Config) -> eyre::Result<SystemBuilder> {
    use sorter_hardware::{SimAxis, SimBeam, SimLine, SimPwm, SimStrip};

    let start = match std::env::var(SIM_AXIS_START_ENV) {
        Ok(s) => s
            .parse::<i64>()
            .wrap_err_with(|| format!("{SIM_AXIS_START_ENV} must be an integer"))?,
        Err(_) => i64::from(cfg.sweeper.max_position / 8),
    };
    let axis = SimAxis::new(start, i64::from(cfg.sweeper.max_position));
    let strip = SimStrip::new(cfg.lights.count);
    tracing::info!(axis_start = start, "using simulated hardware");

    Ok(builder
        .with_belt(BeltDrive {
            direction: Box::new(SimLine::new()),
            pwm: Box::new(SimPwm::new()),
        })
        .with_sweeper(
            SweeperPins {
                direction: Box::new(axis.direction_line()),
                step: Box::new(axis.step_line()),
            },
            Box::new(axis.limit_switch()),
        )
        .with_strip(Box::new(move || {
            Ok(Box::new(strip.clone()) as Box<dyn sorter_traits::PixelStrip>)
        }))
        .with_beam_sensor(Box::new(SimBeam::new())))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn with_drives(builder: SystemBuilder, cfg: &Config) -> eyre::Result<SystemBuilder> {
    use sorter_hardware::gpio::{self, GpioEdge, GpioLine, GpioPwm};
    use sorter_hardware::ws2812::SpiStrip;

    let pins = &cfg.pins;
    let gpio = gpio::open().wrap_err("open gpio")?;
    let belt = BeltDrive {
        direction: Box::new(GpioLine::open(&gpio, pins.belt_dir).wrap_err("open belt pins")?),
        pwm: Box::new(GpioPwm::open(&gpio, pins.belt_step).wrap_err("open belt pins")?),
    };
    let sweeper = SweeperPins {
        direction: Box::new(GpioLine::open(&gpio, pins.sweeper_dir).wrap_err("open sweeper pins")?),
        step: Box::new(GpioLine::open(&gpio, pins.sweeper_step).wrap_err("open sweeper pins")?),
    };
    let limit = GpioEdge::open(&gpio, pins.limit_switch, cfg.sweeper.limit_active_low)
        .wrap_err("open limit switch")?;
    // beam-break receivers pull the line low when the beam is cut
    let beam = GpioEdge::open(&gpio, pins.beam_break, true).wrap_err("open beam sensor")?;

    let (bus, count, brightness) = (pins.led_spi_bus, cfg.lights.count, cfg.lights.brightness);
    tracing::info!(bus, count, "using Raspberry Pi hardware");

    Ok(builder
        .with_belt(belt)
        .with_sweeper(sweeper, Box::new(limit))
        .with_strip(Box::new(move || {
            Ok(Box::new(SpiStrip::open(bus, count, brightness)?) as Box<dyn sorter_traits::PixelStrip>)
        }))
        .with_beam_sensor(Box::new(beam)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scripts() {
        let s = parse_script("resistor:91.5, diode:70").unwrap();
        assert_eq!(s, vec![("resistor".into(), 91.5), ("diode".into(), 70.0)]);
        assert!(parse_script("resistor").is_err());
        assert!(parse_script("resistor:high").is_err());
        assert!(parse_script("").unwrap().is_empty());
    }
}
