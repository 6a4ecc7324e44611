//! Consumer side of the pipeline: epoch check, geometry mapping and hand-off
//! to an [`OverlayPresenter`].

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::debug;

use crate::{
    mapper::PreviewLayout,
    overlay::{OverlayFrame, OverlayPresenter, build_overlay},
    pipeline::controller::{AnalysisOutcome, Shared},
};

const PRESENT_POLL: Duration = Duration::from_millis(100);

/// Receives analysis outcomes from the worker and turns the current ones into
/// overlays.
pub struct ResultHandler {
    receiver: Receiver<AnalysisOutcome>,
    shared: Arc<Shared>,
    layout: PreviewLayout,
}

impl ResultHandler {
    pub(crate) fn new(
        receiver: Receiver<AnalysisOutcome>,
        shared: Arc<Shared>,
        layout: PreviewLayout,
    ) -> Self {
        Self {
            receiver,
            shared,
            layout,
        }
    }

    /// Epoch check and mapping for one outcome.
    ///
    /// Returns `None` when the outcome predates the active epoch.
    pub fn accept(&self, outcome: AnalysisOutcome) -> Option<OverlayFrame> {
        let current = self.shared.snapshot().epoch;
        if outcome.epoch != current {
            self.shared.stats.stale.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("vision_stale_results_total").increment(1);
            return None;
        }

        let overlay = build_overlay(
            outcome.mode,
            &outcome.batch,
            &self.layout,
            outcome.orientation,
        );
        self.shared.stats.presented.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("vision_overlays_presented_total").increment(1);
        Some(OverlayFrame {
            epoch: outcome.epoch,
            frame_number: outcome.frame_number,
            timestamp_ms: outcome.timestamp_ms,
            mode: outcome.mode,
            orientation: outcome.orientation.label(),
            overlay,
        })
    }

    /// Raw outcome from the worker, before the epoch check.
    pub fn recv_outcome(&self, timeout: Duration) -> Result<AnalysisOutcome, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Wait up to `timeout` for the next outcome.
    ///
    /// `Ok(None)` means an outcome arrived but was stale.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<OverlayFrame>, RecvTimeoutError> {
        let outcome = self.receiver.recv_timeout(timeout)?;
        Ok(self.accept(outcome))
    }

    /// Next overlay that survives the epoch check, skipping stale outcomes.
    ///
    /// Returns `None` on timeout or once the worker has stopped.
    pub fn next_overlay(&self, timeout: Duration) -> Option<OverlayFrame> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.recv_timeout(remaining) {
                Ok(Some(frame)) => return Some(frame),
                Ok(None) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Deliver overlays to `presenter` until the worker stops or `shutdown` is set.
    pub fn run<P: OverlayPresenter>(&self, presenter: &mut P, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Relaxed) {
            match self.recv_timeout(PRESENT_POLL) {
                Ok(Some(frame)) => presenter.present(frame),
                Ok(None) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("analysis worker finished; presenter loop exiting");
                    break;
                }
            }
        }
    }
}
