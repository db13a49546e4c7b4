//! WS2812 status strip: boot rainbow, user fill colour and the status pixel.
//!
//! The last pixel is reserved for the system status and is re-applied after
//! every fill or animation frame. Fills requested from the UI are handed to a
//! writer thread so a slow strip never blocks the caller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel as xch;
use sorter_traits::{HwResult, PixelStrip, Rgb};

use crate::SharedClock;
use crate::colour::{ColourChange, Hsv, rainbow_frame};
use crate::config::LightsCfg;
use crate::error::{Result, SorterError};
use crate::hw_error::hw;
use crate::status::SystemStatus;

/// Opens (or re-opens) the strip. Called once at start and on every `reset`.
pub type StripFactory = Box<dyn FnMut() -> HwResult<Box<dyn PixelStrip>> + Send>;

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Strip plus the status pixel that must survive every repaint.
struct Panel {
    strip: Mutex<Box<dyn PixelStrip>>,
    status: Mutex<Option<Rgb>>,
    frame: Mutex<Vec<Rgb>>,
}

impl Panel {
    fn paint(&self, body: impl FnOnce(&mut [Rgb])) -> HwResult<()> {
        let mut strip = lock(&self.strip);
        let mut frame = lock(&self.frame);
        frame.resize(strip.len(), Rgb::OFF);
        body(&mut frame);
        if let (Some(last), Some(colour)) = (frame.last_mut(), *lock(&self.status)) {
            *last = colour;
        }
        for (i, px) in frame.iter().enumerate() {
            strip.set_pixel(i, *px);
        }
        strip.show()
    }

    fn fill(&self, colour: Rgb) -> HwResult<()> {
        self.paint(|frame| frame.fill(colour))
    }

    fn set_status(&self, colour: Rgb) -> HwResult<()> {
        *lock(&self.status) = Some(colour);
        let mut strip = lock(&self.strip);
        let len = strip.len();
        if len == 0 {
            return Ok(());
        }
        strip.set_pixel(len - 1, colour);
        if let Some(last) = lock(&self.frame).get_mut(len - 1) {
            *last = colour;
        }
        strip.show()
    }
}

struct Worker {
    stop: xch::Sender<()>,
    handle: JoinHandle<()>,
}

struct Writer {
    tx: xch::Sender<Rgb>,
    handle: JoinHandle<()>,
}

pub struct StatusLights {
    panel: Arc<Panel>,
    factory: Mutex<StripFactory>,
    colour: Mutex<Hsv>,
    boot: Mutex<Option<Worker>>,
    writer: Mutex<Option<Writer>>,
    cfg: LightsCfg,
    clock: SharedClock,
}

impl StatusLights {
    /// Open the strip and start the boot animation.
    pub fn new(mut factory: StripFactory, cfg: LightsCfg, clock: SharedClock) -> Result<Self> {
        let strip = factory().map_err(hw)?;
        let panel = Arc::new(Panel {
            frame: Mutex::new(vec![Rgb::OFF; strip.len()]),
            strip: Mutex::new(strip),
            status: Mutex::new(None),
        });
        let writer = spawn_writer(Arc::clone(&panel))?;
        let lights = Self {
            panel,
            factory: Mutex::new(factory),
            colour: Mutex::new(Hsv::default()),
            boot: Mutex::new(None),
            writer: Mutex::new(Some(writer)),
            cfg,
            clock,
        };
        lights.start_boot()?;
        Ok(lights)
    }

    pub fn colour(&self) -> Hsv {
        *lock(&self.colour)
    }

    /// Merge `change` into the colour state and fill the strip with the result.
    ///
    /// Stops a running boot animation first. The fill itself is asynchronous.
    pub fn change_colour(&self, change: ColourChange) -> Result<Rgb> {
        let rgb = {
            let mut colour = lock(&self.colour);
            *colour = colour.merge(change);
            colour.to_rgb()
        };
        self.stop_boot();
        let writer = lock(&self.writer);
        let writer = writer.as_ref().ok_or(SorterError::Shutdown)?;
        writer.tx.send(rgb).map_err(|_| SorterError::Shutdown)?;
        tracing::debug!(?rgb, "strip fill queued");
        Ok(rgb)
    }

    /// Write the status pixel now.
    pub fn set_status_light(&self, status: SystemStatus) -> Result<()> {
        self.panel.set_status(status.lamp()).map_err(hw)
    }

    /// Re-open the strip and replay the boot animation. The colour state is kept.
    pub fn reset(&self) -> Result<()> {
        self.stop_boot();
        let strip = {
            let mut factory = lock(&self.factory);
            (*factory)().map_err(hw)?
        };
        {
            let mut current = lock(&self.panel.strip);
            *current = strip;
        }
        tracing::info!("strip reset");
        self.start_boot()
    }

    pub fn is_animating(&self) -> bool {
        lock(&self.boot)
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Block until the boot animation has run to completion.
    pub fn wait_boot(&self) {
        let worker = lock(&self.boot).take();
        if let Some(w) = worker {
            let _ = w.handle.join();
        }
    }

    /// Stop the animation, flush pending fills and join both threads.
    pub fn shutdown(&self) {
        self.stop_boot();
        let writer = lock(&self.writer).take();
        if let Some(w) = writer {
            drop(w.tx);
            let _ = w.handle.join();
        }
    }

    fn start_boot(&self) -> Result<()> {
        let (stop, stop_rx) = xch::bounded::<()>(1);
        let panel = Arc::clone(&self.panel);
        let cfg = self.cfg;
        let clock = Arc::clone(&self.clock);
        let handle = thread::Builder::new()
            .name("strip-boot".into())
            .spawn(move || run_boot(&panel, &stop_rx, cfg, &clock))
            .map_err(|e| SorterError::Hardware(format!("spawn boot animation: {e}")))?;
        *lock(&self.boot) = Some(Worker { stop, handle });
        Ok(())
    }

    fn stop_boot(&self) {
        let worker = lock(&self.boot).take();
        if let Some(w) = worker {
            let _ = w.stop.try_send(());
            let _ = w.handle.join();
        }
    }
}

impl Drop for StatusLights {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_boot(panel: &Panel, stop: &xch::Receiver<()>, cfg: LightsCfg, clock: &SharedClock) {
    let mut step = 0.0_f32;
    for frame in 0..cfg.boot_frames {
        // checked between frames only, a frame is never half written
        if !matches!(stop.try_recv(), Err(xch::TryRecvError::Empty)) {
            tracing::debug!(frame, "boot animation stopped");
            return;
        }
        if let Err(e) = panel.paint(|px| rainbow_frame(step, px)) {
            tracing::warn!(error = %e, "boot frame failed");
        }
        clock.sleep(cfg.frame_delay);
        step += cfg.boot_hue_step;
    }
    if let Err(e) = panel.fill(cfg.idle_colour) {
        tracing::warn!(error = %e, "idle fill failed");
    }
}

fn spawn_writer(panel: Arc<Panel>) -> Result<Writer> {
    let (tx, rx) = xch::unbounded::<Rgb>();
    let handle = thread::Builder::new()
        .name("strip-writer".into())
        .spawn(move || {
            while let Ok(mut colour) = rx.recv() {
                // only the newest fill matters
                while let Ok(newer) = rx.try_recv() {
                    colour = newer;
                }
                if let Err(e) = panel.fill(colour) {
                    tracing::warn!(error = %e, "strip fill failed");
                }
            }
        })
        .map_err(|e| SorterError::Hardware(format!("spawn strip writer: {e}")))?;
    Ok(Writer { tx, handle })
}
