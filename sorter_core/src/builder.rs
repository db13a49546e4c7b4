//! Builder assembling a `SystemController` from raw hardware parts.
//!
//! Drives, configuration and collaborators are supplied piecemeal; `try_build`
//! checks that every required part is present, constructs the belt, sweeper,
//! lights, dispatcher and beam listener, and returns the shared controller.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use eyre::WrapErr;
use sorter_traits::{Clock, EdgeInput, MonotonicClock, NullSink, StatusSink};

use crate::SharedClock;
use crate::belt::{Belt, BeltDrive};
use crate::bins::BinMap;
use crate::config::{BeltCfg, LightsCfg, SortingCfg, SweeperCfg};
use crate::dispatcher::SortDispatcher;
use crate::error::BuildError;
use crate::lights::{StatusLights, StripFactory};
use crate::status::SystemStatus;
use crate::sweeper::{Positioner, Sweeper, SweeperPins};
use crate::system::SystemController;
use crate::vision::Vision;

#[derive(Default)]
pub struct SystemBuilder {
    belt: Option<BeltDrive>,
    sweeper: Option<(SweeperPins, Box<dyn EdgeInput>)>,
    strip: Option<StripFactory>,
    vision: Option<Arc<dyn Vision>>,
    positioner: Option<Arc<dyn Positioner>>,
    bins: Option<BinMap>,
    beam: Option<Box<dyn EdgeInput>>,
    sink: Option<Arc<dyn StatusSink>>,
    clock: Option<SharedClock>,
    belt_cfg: BeltCfg,
    sweeper_cfg: SweeperCfg,
    lights_cfg: LightsCfg,
    sorting_cfg: SortingCfg,
}

impl SystemBuilder {
    pub fn with_belt(mut self, drive: BeltDrive) -> Self {
        self.belt = Some(drive);
        self
    }

    pub fn with_sweeper(mut self, pins: SweeperPins, limit_switch: Box<dyn EdgeInput>) -> Self {
        self.sweeper = Some((pins, limit_switch));
        self
    }

    pub fn with_strip(mut self, factory: StripFactory) -> Self {
        self.strip = Some(factory);
        self
    }

    pub fn with_vision(mut self, vision: Arc<dyn Vision>) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Route dispatched sorts through `positioner` instead of the sweeper.
    pub fn with_positioner(mut self, positioner: Arc<dyn Positioner>) -> Self {
        self.positioner = Some(positioner);
        self
    }

    pub fn with_bins(mut self, bins: BinMap) -> Self {
        self.bins = Some(bins);
        self
    }

    /// Optional; without it only manual sorting is available.
    pub fn with_beam_sensor(mut self, beam: Box<dyn EdgeInput>) -> Self {
        self.beam = Some(beam);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_belt_cfg(mut self, cfg: BeltCfg) -> Self {
        self.belt_cfg = cfg;
        self
    }

    pub fn with_sweeper_cfg(mut self, cfg: SweeperCfg) -> Self {
        self.sweeper_cfg = cfg;
        self
    }

    pub fn with_lights_cfg(mut self, cfg: LightsCfg) -> Self {
        self.lights_cfg = cfg;
        self
    }

    pub fn with_sorting_cfg(mut self, cfg: SortingCfg) -> Self {
        self.sorting_cfg = cfg;
        self
    }

    /// Take every runtime section and the bin map from a loaded config file.
    pub fn apply_config(self, cfg: &sorter_config::Config) -> eyre::Result<Self> {
        let bins = BinMap::try_from(cfg).wrap_err("bin map")?;
        Ok(self
            .with_belt_cfg(BeltCfg::from(&cfg.belt))
            .with_sweeper_cfg(SweeperCfg::from(&cfg.sweeper))
            .with_lights_cfg(LightsCfg::from(&cfg.lights))
            .with_sorting_cfg(SortingCfg::from(&cfg.sorting))
            .with_bins(bins))
    }

    /// The controller starts disabled with the boot animation running.
    pub fn try_build(self) -> eyre::Result<Arc<SystemController>> {
        let belt_drive = self.belt.ok_or(BuildError::MissingBelt)?;
        let (pins, mut limit) = self.sweeper.ok_or(BuildError::MissingSweeper)?;
        let strip = self.strip.ok_or(BuildError::MissingLights)?;
        let vision = self.vision.ok_or(BuildError::MissingVision)?;
        let bins = self.bins.ok_or(BuildError::MissingBins)?;
        let sink = self.sink.unwrap_or_else(|| Arc::new(NullSink));
        let clock: SharedClock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        let belt = Arc::new(Belt::new(belt_drive, self.belt_cfg, Arc::clone(&clock)));
        let sweeper = Arc::new(
            Sweeper::new(pins, limit.as_mut(), self.sweeper_cfg, Arc::clone(&clock))
                .wrap_err("sweeper")?,
        );
        let lights = Arc::new(
            StatusLights::new(strip, self.lights_cfg, Arc::clone(&clock)).wrap_err("status lights")?,
        );
        let positioner = self
            .positioner
            .unwrap_or_else(|| Arc::clone(&sweeper) as Arc<dyn Positioner>);
        let dispatcher = SortDispatcher::spawn(
            positioner,
            bins,
            Arc::clone(&sink),
            Arc::clone(&clock),
        )
        .wrap_err("sort dispatcher")?;

        let system = Arc::new(SystemController {
            belt,
            sweeper,
            lights,
            dispatcher,
            vision,
            sink,
            clock,
            cfg: self.sorting_cfg,
            enabled: AtomicBool::new(false),
            cycle_active: AtomicBool::new(false),
            status: Mutex::new(SystemStatus::Disabled),
            tasks: Mutex::new(Vec::new()),
            beam: Mutex::new(None),
            inputs: Mutex::new(Vec::new()),
        });
        if let Err(e) = system.lights.set_status_light(SystemStatus::Disabled) {
            tracing::warn!(error = %e, "status light update failed");
        }
        if let Some(mut beam) = self.beam {
            system
                .attach_beam_sensor(beam.as_mut())
                .wrap_err("beam sensor")?;
            system.keep_input(beam);
        }
        system.keep_input(limit);
        tracing::info!("sorter assembled");
        Ok(system)
    }
}
