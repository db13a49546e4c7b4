//! Single-slot classification worker.
//!
//! At most one classification is in flight. A result nobody waited for is
//! dropped when the next request goes out, so a late answer can never be
//! attributed to the wrong part.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel as xch;
use sorter_traits::{Classification, Classifier, FrameSource};

use crate::error::{Result, SorterError};
use crate::hw_error::hw;

/// Anything that can classify the part under the camera.
pub trait Vision: Send + Sync {
    /// Classify the current part, giving up after `timeout`.
    fn classify(&self, timeout: Duration) -> Result<Classification>;

    fn shutdown(&self) {}
}

pub struct VisionWorker {
    requests: Mutex<Option<xch::Sender<()>>>,
    results: xch::Receiver<Result<Classification>>,
    in_flight: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl VisionWorker {
    pub fn spawn(
        mut camera: Box<dyn FrameSource>,
        mut classifier: Box<dyn Classifier>,
    ) -> Result<Self> {
        let (req_tx, req_rx) = xch::bounded::<()>(1);
        let (res_tx, res_rx) = xch::bounded::<Result<Classification>>(1);
        let in_flight = Arc::new(AtomicBool::new(false));

        let handle = {
            let in_flight = Arc::clone(&in_flight);
            let stale = res_rx.clone();
            thread::Builder::new()
                .name("vision".into())
                .spawn(move || {
                    for () in req_rx.iter() {
                        let result = camera
                            .capture()
                            .and_then(|frame| classifier.classify(&frame))
                            .map_err(hw);
                        if let Ok(c) = &result {
                            tracing::debug!(label = %c.label, confidence = c.confidence, "classified");
                        }
                        // newest result wins
                        while stale.try_recv().is_ok() {}
                        let _ = res_tx.try_send(result);
                        in_flight.store(false, Ordering::Release);
                    }
                })
                .map_err(|e| SorterError::Hardware(format!("spawn vision worker: {e}")))?
        };

        Ok(Self {
            requests: Mutex::new(Some(req_tx)),
            results: res_rx,
            in_flight,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Ask for a classification without waiting for it.
    pub fn request(&self) -> Result<()> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(SorterError::VisionBusy);
        }
        while self.results.try_recv().is_ok() {}
        let requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let sent = match requests.as_ref() {
            Some(tx) => tx.try_send(()).map_err(|e| match e {
                xch::TrySendError::Full(()) => SorterError::VisionBusy,
                xch::TrySendError::Disconnected(()) => SorterError::Shutdown,
            }),
            None => Err(SorterError::Shutdown),
        };
        if sent.is_err() {
            self.in_flight.store(false, Ordering::Release);
        }
        sent
    }

    /// The latest result, if one has arrived.
    pub fn poll(&self) -> Option<Result<Classification>> {
        self.results.try_recv().ok()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Vision for VisionWorker {
    fn classify(&self, timeout: Duration) -> Result<Classification> {
        self.request()?;
        match self.results.recv_timeout(timeout) {
            Ok(result) => result,
            Err(xch::RecvTimeoutError::Timeout) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "classification timed out");
                Err(SorterError::Timeout)
            }
            Err(xch::RecvTimeoutError::Disconnected) => Err(SorterError::Shutdown),
        }
    }

    fn shutdown(&self) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(h) = handle {
            let _ = h.join();
        }
    }
}

impl Drop for VisionWorker {
    fn drop(&mut self) {
        Vision::shutdown(self);
    }
}
