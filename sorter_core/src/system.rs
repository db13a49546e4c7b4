//! System controller: ties the belt, sweeper, lights, dispatcher and vision
//! into the beam-break sort cycle and the manual commands.
//!
//! Long-running work (sort cycles, homing, manual moves) runs on task threads
//! so the caller (UI or interrupt listener) never blocks. Every task handle is
//! kept and joined on `shutdown`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};

use crossbeam_channel as xch;
use sorter_config::REFUSE;
use sorter_traits::{EdgeInput, Level, Rgb, StatusSink};

use crate::SharedClock;
use crate::belt::Belt;
use crate::colour::ColourChange;
use crate::config::SortingCfg;
use crate::debounce::Debouncer;
use crate::dispatcher::SortDispatcher;
use crate::error::{Result, SorterError};
use crate::hw_error::hw;
use crate::lights::StatusLights;
use crate::status::SystemStatus;
use crate::sweeper::{MoveOutcome, Sweeper};
use crate::util::{as_ms, travel_time};
use crate::vision::Vision;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears `cycle_active` when a beam-break cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Beam tokens waiting for the listener.
const BEAM_QUEUE: usize = 16;

pub(crate) struct BeamListener {
    stop: xch::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct SystemController {
    pub(crate) belt: Arc<Belt>,
    pub(crate) sweeper: Arc<Sweeper>,
    pub(crate) lights: Arc<StatusLights>,
    pub(crate) dispatcher: SortDispatcher,
    pub(crate) vision: Arc<dyn Vision>,
    pub(crate) sink: Arc<dyn StatusSink>,
    pub(crate) clock: SharedClock,
    pub(crate) cfg: SortingCfg,
    pub(crate) enabled: AtomicBool,
    pub(crate) cycle_active: AtomicBool,
    pub(crate) status: Mutex<SystemStatus>,
    pub(crate) tasks: Mutex<Vec<JoinHandle<()>>>,
    pub(crate) beam: Mutex<Option<BeamListener>>,
    /// Interrupt inputs stay registered only while their handles live.
    pub(crate) inputs: Mutex<Vec<Box<dyn EdgeInput>>>,
}

impl SystemController {
    pub fn builder() -> crate::builder::SystemBuilder {
        crate::builder::SystemBuilder::default()
    }

    // ── accessors ──────────────────────────────────────────────────────────

    pub fn status(&self) -> SystemStatus {
        *lock(&self.status)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn belt(&self) -> &Belt {
        &self.belt
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    pub fn lights(&self) -> &StatusLights {
        &self.lights
    }

    pub fn dispatcher(&self) -> &SortDispatcher {
        &self.dispatcher
    }

    fn set_status(&self, status: SystemStatus) {
        let mut current = lock(&self.status);
        let previous = *current;
        if previous != status {
            tracing::info!(from = %previous, to = %status, "status");
        }
        *current = status;
        if let Err(e) = self.lights.set_status_light(status) {
            tracing::warn!(error = %e, "status light update failed");
        }
    }

    /// Status after a cycle or command finished: emergency wins, then
    /// disabled, then ready.
    fn settle_status(&self) -> SystemStatus {
        let next = if self.sweeper.emergency_latched() {
            SystemStatus::EmergencyStop
        } else if !self.is_enabled() {
            SystemStatus::Disabled
        } else {
            SystemStatus::Ready
        };
        self.set_status(next);
        next
    }

    // ── beam-break sort cycle ──────────────────────────────────────────────

    /// Register a debounced beam-break callback on `beam`.
    ///
    /// The callback only queues a token; a listener thread turns each token
    /// into a sort cycle.
    pub fn attach_beam_sensor(self: &Arc<Self>, beam: &mut dyn EdgeInput) -> Result<()> {
        let (tx, rx) = xch::bounded::<()>(BEAM_QUEUE);
        let debouncer = Debouncer::new(Arc::clone(&self.clock), self.cfg.beam_debounce);
        let dropped = Arc::new(AtomicUsize::new(0));
        let cb_dropped = Arc::clone(&dropped);
        beam.on_edge(Box::new(move || {
            // A full queue means a backlog of cycles that would all be refused
            // anyway; the callback must not block, so the token is dropped
            // and counted for the listener to report.
            if debouncer.accept() && tx.try_send(()).is_err() {
                cb_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }))
        .map_err(hw)?;

        let (stop, stop_rx) = xch::bounded::<()>(0);
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = thread::Builder::new()
            .name("beam-listener".into())
            .spawn(move || {
                loop {
                    xch::select! {
                        recv(rx) -> msg => {
                            if msg.is_err() { break; }
                            let Some(system) = weak.upgrade() else { break };
                            let lost = dropped.swap(0, Ordering::Relaxed);
                            if lost > 0 {
                                tracing::warn!(lost, "beam breaks dropped, beam queue full");
                            }
                            system.on_beam_break();
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
                tracing::debug!("beam listener stopped");
            })
            .map_err(|e| SorterError::Hardware(format!("spawn beam listener: {e}")))?;
        *lock(&self.beam) = Some(BeamListener { stop, handle });
        Ok(())
    }

    /// Non-blocking entry point for a beam break: the cycle runs on its own task.
    pub fn on_beam_break(self: &Arc<Self>) {
        let system = Arc::clone(self);
        self.spawn_task("sort-cycle", move || system.handle_beam_break());
    }

    /// One beam-break cycle, run on the calling thread.
    ///
    /// If a cycle is already running or the dispatcher is busy the part is
    /// sent straight to the refuse bin without classifying it.
    pub fn handle_beam_break(&self) {
        let status = self.status();
        if !self.is_enabled() || status.suppresses_sorting() {
            tracing::debug!(%status, "beam break ignored");
            return;
        }
        // bin positions mean nothing until the sweeper has found home
        if !self.sweeper.is_homed() {
            tracing::warn!("beam break ignored, sweeper not homed");
            self.sink.status("Sweeper is not homed", Level::Error);
            return;
        }
        if self.dispatcher.is_busy()
            || self
                .cycle_active
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            tracing::info!("sorter busy, refusing part");
            if let Err(e) = self.dispatcher.add(REFUSE) {
                tracing::warn!(error = %e, "could not queue refused part");
            }
            return;
        }
        let _cycle = CycleGuard(&self.cycle_active);

        self.set_status(SystemStatus::Busy);
        self.clock.sleep(self.cfg.beam_settle);
        if let Err(e) = self.belt.stop() {
            tracing::warn!(error = %e, "belt stop failed");
        }

        let started = self.clock.now();
        let label = match self.vision.classify(self.cfg.classify_timeout) {
            Ok(c) => {
                self.sink.classification(&c.label, c.confidence);
                c.label
            }
            Err(e) => {
                tracing::warn!(error = %e, "classification failed, refusing part");
                REFUSE.to_string()
            }
        };
        let elapsed = self.clock.now().saturating_duration_since(started);
        self.sink.latency(elapsed);
        tracing::info!(label = %label, latency_ms = as_ms(elapsed), "part classified");

        if let Err(e) = self.dispatcher.add(label) {
            tracing::warn!(error = %e, "could not queue part");
        }
        if !self.is_enabled() || self.sweeper.emergency_latched() {
            tracing::info!("belt left stopped, sorting suppressed mid-cycle");
        } else {
            if let Err(e) = self.belt.start(self.belt.default_sort_speed()) {
                tracing::warn!(error = %e, "belt restart failed");
            }
            self.set_status(SystemStatus::Working);
        }
        self.dispatcher.wait_idle();
        if self.settle_status().suppresses_sorting()
            && let Err(e) = self.belt.stop()
        {
            tracing::warn!(error = %e, "belt stop failed");
        }
    }

    // ── manual commands ────────────────────────────────────────────────────

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        tracing::info!(enabled, "system enable");
        if enabled {
            self.sink.status("System enabled", Level::Ok);
            self.settle_status();
        } else {
            if let Err(e) = self.belt.stop() {
                tracing::warn!(error = %e, "belt stop failed");
            }
            self.sink.status("System disabled", Level::Info);
            self.set_status(SystemStatus::Disabled);
        }
    }

    /// Run the belt at `speed`; zero stops it.
    pub fn set_speed(&self, speed: i8) -> Result<()> {
        if !self.is_enabled() {
            self.sink.status("System is disabled", Level::Error);
            return Err(SorterError::Disabled);
        }
        self.belt.start(speed)
    }

    pub fn set_colour(&self, change: ColourChange) -> Result<Rgb> {
        let rgb = self.lights.change_colour(change)?;
        self.sink.colour(rgb);
        Ok(rgb)
    }

    pub fn reset_strip(&self) -> Result<()> {
        self.lights.reset()?;
        self.lights.set_status_light(self.status())
    }

    /// Home the sweeper on a task thread.
    pub fn home(self: &Arc<Self>) {
        let system = Arc::clone(self);
        self.spawn_task("home", move || {
            let _ = system.home_blocking();
        });
    }

    /// Home the sweeper on the calling thread.
    pub fn home_blocking(&self) -> Result<MoveOutcome> {
        self.sink.status("Homing", Level::Warn);
        self.set_status(SystemStatus::Busy);
        let outcome = self.sweeper.home();
        match &outcome {
            Ok(_) => {
                self.sink.status("Homed", Level::Ok);
                self.sink.position(self.sweeper.position());
            }
            Err(e) => self.report_fault(e),
        }
        self.settle_status();
        outcome
    }

    /// Move the sweeper by `steps` on a task thread.
    pub fn move_by(self: &Arc<Self>, steps: i32) {
        let system = Arc::clone(self);
        self.spawn_task("manual-move", move || {
            let _ = system.move_by_blocking(steps);
        });
    }

    pub fn move_by_blocking(&self, steps: i32) -> Result<MoveOutcome> {
        let outcome = self.sweeper.move_relative(steps);
        match &outcome {
            Ok(_) => self.sink.position(self.sweeper.position()),
            Err(e) => {
                self.report_fault(e);
                if e.is_emergency() {
                    self.settle_status();
                }
            }
        }
        outcome
    }

    /// Manual sort of the part already on the belt into `label`'s bin.
    ///
    /// Rejected while disabled or unhomed. Otherwise returns immediately and
    /// runs the sort on a task thread.
    pub fn sort(self: &Arc<Self>, label: &str) -> Result<()> {
        self.check_manual_sort()?;
        let (bin, target) = self.dispatcher.bins().resolve(label);
        self.sink.status(&format!("Sorting to {bin}"), Level::Warn);
        let system = Arc::clone(self);
        self.spawn_task("manual-sort", move || {
            let _ = system.run_manual_sort(target);
        });
        Ok(())
    }

    /// Manual sort on the calling thread.
    pub fn sort_blocking(&self, label: &str) -> Result<MoveOutcome> {
        self.check_manual_sort()?;
        let (bin, target) = self.dispatcher.bins().resolve(label);
        self.sink.status(&format!("Sorting to {bin}"), Level::Warn);
        self.run_manual_sort(target)
    }

    fn check_manual_sort(&self) -> Result<()> {
        if !self.is_enabled() {
            self.sink.status("System is disabled", Level::Error);
            return Err(SorterError::Disabled);
        }
        if !self.sweeper.is_homed() {
            self.sink.status("Sweeper is not homed", Level::Error);
            return Err(SorterError::NotHomed);
        }
        Ok(())
    }

    /// Move the sweeper while the belt runs in reverse long enough to carry
    /// the part `target + travel_offset` units.
    fn run_manual_sort(&self, target: i32) -> Result<MoveOutcome> {
        let speed = self.belt.default_sort_speed();
        let distance = f64::from(target) + self.cfg.travel_offset;
        let budget = travel_time(distance, speed, self.belt.distance_multiplier())
            .ok_or_else(|| SorterError::Config(format!("cannot carry a part {distance} units")))?;
        tracing::info!(target, speed, budget_ms = as_ms(budget), "manual sort");

        let moved = thread::scope(|s| {
            let mover = s.spawn(|| self.sweeper.move_absolute(target));
            let started = self.clock.now();
            if let Err(e) = self.belt.start(-speed) {
                tracing::warn!(error = %e, "belt reverse failed");
            }
            while self.clock.now().saturating_duration_since(started) < budget {
                self.clock.sleep(self.cfg.poll_interval);
            }
            if let Err(e) = self.belt.stop() {
                tracing::warn!(error = %e, "belt stop failed");
            }
            mover
                .join()
                .unwrap_or_else(|_| Err(SorterError::HardwareFault("sweeper task panicked".into())))
        });

        match &moved {
            Ok(_) => {
                self.sink.position(self.sweeper.position());
                self.sink.status("Sorting done", Level::Ok);
            }
            Err(e) => {
                self.report_fault(e);
                self.settle_status();
            }
        }
        moved
    }

    fn report_fault(&self, e: &SorterError) {
        let level = match e {
            SorterError::EmergencyStop(_) => Level::Error,
            _ => Level::Warn,
        };
        tracing::warn!(error = %e, "command failed");
        self.sink.status(&e.to_string(), level);
    }

    // ── lifecycle ──────────────────────────────────────────────────────────

    pub(crate) fn keep_input(&self, input: Box<dyn EdgeInput>) {
        lock(&self.inputs).push(input);
    }

    fn spawn_task<F>(&self, name: &str, body: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match thread::Builder::new().name(name.into()).spawn(body) {
            Ok(handle) => {
                let mut tasks = lock(&self.tasks);
                tasks.retain(|h| !h.is_finished());
                tasks.push(handle);
            }
            Err(e) => tracing::error!(error = %e, task = name, "could not spawn task"),
        }
    }

    /// Join every task spawned so far.
    pub fn join_tasks(&self) {
        loop {
            let pending: Vec<_> = lock(&self.tasks).drain(..).collect();
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                if handle.join().is_err() {
                    tracing::error!("task panicked");
                }
            }
        }
    }

    /// Stop intake, finish queued work, then stop every worker.
    pub fn shutdown(&self) {
        tracing::info!("shutting down");
        lock(&self.inputs).clear();
        let beam = lock(&self.beam).take();
        if let Some(listener) = beam {
            drop(listener.stop);
            let _ = listener.handle.join();
        }
        self.enabled.store(false, Ordering::Release);
        self.join_tasks();
        self.set_status(SystemStatus::Disabled);
        if let Err(e) = self.belt.stop() {
            tracing::warn!(error = %e, "belt stop failed");
        }
        self.dispatcher.shutdown();
        self.vision.shutdown();
        self.lights.shutdown();
    }
}
