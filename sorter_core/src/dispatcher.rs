//! FIFO sort queue drained by a single worker that parks the sweeper.
//!
//! `add` never blocks. The dispatcher is busy from the moment an entry is
//! queued until its move has finished, so queued-but-unstarted work counts.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use sorter_traits::{Level, StatusSink};

use crate::SharedClock;
use crate::bins::BinMap;
use crate::error::{Result, SorterError};
use crate::sweeper::Positioner;
use crate::util::as_ms;

#[derive(Debug, Clone)]
pub struct SortEntry {
    pub label: String,
    pub enqueued_at: Instant,
}

#[derive(Default)]
struct Outstanding {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Outstanding {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self) {
        *self.lock() += 1;
    }

    fn leave(&self) {
        let mut n = self.lock();
        *n = n.saturating_sub(1);
        if *n == 0 {
            self.idle.notify_all();
        }
    }

    fn wait(&self) {
        let mut n = self.lock();
        while *n > 0 {
            n = self.idle.wait(n).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let n = self.lock();
        let (n, _) = self
            .idle
            .wait_timeout_while(n, timeout, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *n == 0
    }
}

pub struct SortDispatcher {
    tx: Mutex<Option<xch::Sender<SortEntry>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    outstanding: Arc<Outstanding>,
    bins: Arc<BinMap>,
    clock: SharedClock,
}

impl SortDispatcher {
    /// Start the worker thread.
    pub fn spawn(
        positioner: Arc<dyn Positioner>,
        bins: BinMap,
        sink: Arc<dyn StatusSink>,
        clock: SharedClock,
    ) -> Result<Self> {
        let (tx, rx) = xch::unbounded::<SortEntry>();
        let outstanding = Arc::new(Outstanding::default());
        let bins = Arc::new(bins);

        let worker = {
            let outstanding = Arc::clone(&outstanding);
            let bins = Arc::clone(&bins);
            let clock = Arc::clone(&clock);
            thread::Builder::new()
                .name("sort-dispatcher".into())
                .spawn(move || {
                    for entry in rx.iter() {
                        dispatch(&entry, positioner.as_ref(), &bins, sink.as_ref(), &clock);
                        outstanding.leave();
                    }
                    tracing::debug!("sort dispatcher drained");
                })
                .map_err(|e| SorterError::Hardware(format!("spawn dispatcher: {e}")))?
        };

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            outstanding,
            bins,
            clock,
        })
    }

    /// Queue a part for sorting. Unknown labels go to the refuse bin.
    pub fn add(&self, label: impl Into<String>) -> Result<()> {
        let entry = SortEntry {
            label: label.into(),
            enqueued_at: self.clock.now(),
        };
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = tx.as_ref().ok_or(SorterError::Shutdown)?;
        self.outstanding.enter();
        tracing::debug!(label = %entry.label, "sort queued");
        tx.send(entry).map_err(|_| {
            self.outstanding.leave();
            SorterError::Shutdown
        })
    }

    pub fn is_busy(&self) -> bool {
        *self.outstanding.lock() > 0
    }

    /// Entries queued or in progress.
    pub fn pending(&self) -> usize {
        *self.outstanding.lock()
    }

    /// Block until every queued entry has been moved.
    pub fn wait_idle(&self) {
        self.outstanding.wait();
    }

    /// Returns `false` if still busy after `timeout`.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        self.outstanding.wait_timeout(timeout)
    }

    pub fn bins(&self) -> &BinMap {
        &self.bins
    }

    /// Stop accepting entries, let the worker drain the queue, then join it.
    pub fn shutdown(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = worker
            && handle.join().is_err()
        {
            tracing::error!("sort dispatcher panicked");
        }
    }
}

impl Drop for SortDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch(
    entry: &SortEntry,
    positioner: &dyn Positioner,
    bins: &BinMap,
    sink: &dyn StatusSink,
    clock: &SharedClock,
) {
    let (bin, target) = bins.resolve(&entry.label);
    let waited_ms = as_ms(clock.now().saturating_duration_since(entry.enqueued_at));
    tracing::info!(label = %entry.label, bin, target, waited_ms, "sorting part");
    match positioner.move_to(target) {
        Ok(_) => sink.position(positioner.position()),
        Err(e) => {
            tracing::error!(error = %e, label = %entry.label, target, "sort move failed");
            sink.status(&format!("Sort failed: {e}"), Level::Error);
        }
    }
}
