//! Pipeline controller: active mode, epoch bookkeeping, and the analysis
//! worker.
//!
//! Producers call [`PipelineController::submit_frame`], which validates the
//! frame and drops it into the single-slot mailbox. One worker thread drains
//! the mailbox, runs the oracle of the mode captured at submission, and sends
//! the batch tagged with that mode's epoch to the [`ResultHandler`]. Mode
//! switches swap an immutable [`ModeSnapshot`] and never touch in-flight work;
//! stale batches are dropped when they reach the handler.

use std::{
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{SendTimeoutError, Sender, bounded};
use ml_core::Observation;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace, warn};
use video_ingest::{Frame, Orientation};

use crate::{
    mapper::PreviewLayout,
    modes::{AnalysisMode, ModeKind, OracleSet},
    pipeline::{
        mailbox::{Deposit, Mailbox},
        results::ResultHandler,
        telemetry,
    },
};

/// Depth of the worker → consumer result channel.
pub const RESULT_QUEUE_DEPTH: usize = 4;
/// How long the worker waits on a full result channel before rechecking shutdown.
const RESULT_SEND_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no oracle installed for {0} mode")]
    ModeUnavailable(ModeKind),
    #[error("failed to spawn analysis worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// What [`PipelineController::submit_frame`] did with a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The mailbox was empty.
    Queued,
    /// A frame that had not started yet was overwritten.
    Replaced,
    /// The frame failed validation and was dropped.
    Rejected,
    /// The worker has stopped; the frame was dropped.
    Closed,
}

/// Active mode and the epoch it was installed in, swapped as one value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModeSnapshot {
    pub mode: AnalysisMode,
    pub epoch: u64,
}

/// Batch produced by one oracle call.
#[derive(Clone, Debug)]
pub struct AnalysisOutcome {
    pub epoch: u64,
    pub mode: ModeKind,
    pub frame_number: u64,
    pub timestamp_ms: i64,
    pub orientation: Orientation,
    pub batch: Vec<Observation>,
    /// The oracle failed; `batch` is empty.
    pub failed: bool,
}

/// Frame waiting in the mailbox with the mode it was submitted under.
pub(crate) struct PendingFrame {
    frame: Frame,
    orientation: Orientation,
    frame_number: u64,
    snapshot: Arc<ModeSnapshot>,
}

#[derive(Default)]
pub(crate) struct PipelineStats {
    pub(crate) submitted: AtomicU64,
    pub(crate) replaced: AtomicU64,
    pub(crate) rejected: AtomicU64,
    pub(crate) closed: AtomicU64,
    pub(crate) analysed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) stale: AtomicU64,
    pub(crate) presented: AtomicU64,
}

/// Point-in-time copy of the pipeline counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub replaced: u64,
    pub rejected: u64,
    /// Frames dropped because the worker had already stopped.
    pub closed: u64,
    pub analysed: u64,
    pub failed: u64,
    pub stale: u64,
    pub presented: u64,
}

impl PipelineStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            analysed: self.analysed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            presented: self.presented.load(Ordering::Relaxed),
        }
    }
}

/// State shared by the controller, its worker and the result handler.
pub(crate) struct Shared {
    snapshot: RwLock<Arc<ModeSnapshot>>,
    mailbox: Mailbox<PendingFrame>,
    pub(crate) stats: PipelineStats,
    running: AtomicBool,
    closed_reported: AtomicBool,
    next_frame: AtomicU64,
}

impl Shared {
    pub(crate) fn snapshot(&self) -> Arc<ModeSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub struct PipelineController {
    shared: Arc<Shared>,
    supported: Vec<ModeKind>,
    worker: Option<thread::JoinHandle<()>>,
}

impl PipelineController {
    /// Start the analysis worker with `initial` as the active mode (epoch 0).
    ///
    /// Returns the controller and the handler that receives its results.
    pub fn spawn(
        oracles: OracleSet,
        initial: AnalysisMode,
        layout: PreviewLayout,
    ) -> Result<(Self, ResultHandler), PipelineError> {
        if !oracles.supports(initial.kind()) {
            return Err(PipelineError::ModeUnavailable(initial.kind()));
        }
        let supported = [ModeKind::Shapes, ModeKind::Classification]
            .into_iter()
            .filter(|kind| oracles.supports(*kind))
            .collect();

        let shared = Arc::new(Shared {
            snapshot: RwLock::new(Arc::new(ModeSnapshot {
                mode: initial,
                epoch: 0,
            })),
            mailbox: Mailbox::new(),
            stats: PipelineStats::default(),
            running: AtomicBool::new(true),
            closed_reported: AtomicBool::new(false),
            next_frame: AtomicU64::new(0),
        });

        let (result_tx, result_rx) = bounded(RESULT_QUEUE_DEPTH);
        let worker_shared = shared.clone();
        let worker = telemetry::spawn_thread("analysis-worker", move || {
            worker_loop(worker_shared, oracles, result_tx)
        })?;

        debug!(mode = %initial.kind(), "analysis pipeline started");
        metrics::gauge!("vision_active_epoch").set(0.0);

        let handler = ResultHandler::new(result_rx, shared.clone(), layout);
        Ok((
            Self {
                shared,
                supported,
                worker: Some(worker),
            },
            handler,
        ))
    }

    /// Hand a frame to the pipeline without waiting for analysis.
    ///
    /// A frame already waiting in the mailbox is overwritten. Frames without a
    /// valid pixel buffer are dropped, as is every frame submitted after the
    /// worker has stopped.
    pub fn submit_frame(&self, frame: Frame, orientation: Orientation) -> SubmitOutcome {
        let stats = &self.shared.stats;
        stats.submitted.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("vision_frames_submitted_total").increment(1);

        if let Err(err) = frame.validate() {
            stats.rejected.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("vision_corrupt_frames_total").increment(1);
            trace!("skipping corrupt frame: {err}");
            return SubmitOutcome::Rejected;
        }

        let frame_number = self.shared.next_frame.fetch_add(1, Ordering::Relaxed) + 1;
        let deposit = self.shared.mailbox.put(PendingFrame {
            frame,
            orientation,
            frame_number,
            snapshot: self.shared.snapshot(),
        });
        match deposit {
            Deposit::Stored => SubmitOutcome::Queued,
            Deposit::Replaced => {
                stats.replaced.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("vision_mailbox_replaced_total").increment(1);
                SubmitOutcome::Replaced
            }
            Deposit::Closed => {
                stats.closed.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("vision_frames_dropped_closed_total").increment(1);
                if !self.shared.closed_reported.swap(true, Ordering::Relaxed) {
                    warn!(frame = frame_number, "analysis worker stopped; dropping frames");
                } else {
                    trace!(frame = frame_number, "dropping frame for stopped worker");
                }
                SubmitOutcome::Closed
            }
        }
    }

    /// Replace the active mode and advance the epoch.
    ///
    /// In-flight analysis keeps running; its result carries the old epoch and
    /// is discarded by the result handler. Returns the new epoch.
    pub fn set_active_mode(&self, mode: AnalysisMode) -> Result<u64, PipelineError> {
        if !self.supported.contains(&mode.kind()) {
            return Err(PipelineError::ModeUnavailable(mode.kind()));
        }
        let epoch = {
            let mut current = self
                .shared
                .snapshot
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let epoch = current.epoch + 1;
            *current = Arc::new(ModeSnapshot { mode, epoch });
            epoch
        };
        metrics::gauge!("vision_active_epoch").set(epoch as f64);
        debug!(epoch, mode = %mode.kind(), "analysis mode switched");
        Ok(epoch)
    }

    pub fn snapshot(&self) -> Arc<ModeSnapshot> {
        self.shared.snapshot()
    }

    pub fn current_mode(&self) -> AnalysisMode {
        self.shared.snapshot().mode
    }

    pub fn current_epoch(&self) -> u64 {
        self.shared.snapshot().epoch
    }

    pub fn supports(&self, kind: ModeKind) -> bool {
        self.supported.contains(&kind)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Whether the worker still accepts frames.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Whether a frame is waiting in the mailbox.
    pub fn has_pending_frame(&self) -> bool {
        self.shared.mailbox.has_pending()
    }

    /// Block until the mailbox is empty and the worker is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.shared.mailbox.wait_idle(timeout)
    }

    /// Stop the worker after its current oracle call and join it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.mailbox.close();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("analysis worker panicked");
            }
        }
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: Arc<Shared>, oracles: OracleSet, results: Sender<AnalysisOutcome>) {
    while let Some(pending) = shared.mailbox.take() {
        let outcome = analyze(&oracles, pending, &shared);
        let delivered = deliver(&shared, &results, outcome);
        shared.mailbox.finish();
        if !delivered {
            break;
        }
    }
    shared.running.store(false, Ordering::SeqCst);
    shared.mailbox.close();
    debug!("analysis worker stopped");
}

/// Run one oracle call. Failures become an empty batch.
fn analyze(oracles: &OracleSet, pending: PendingFrame, shared: &Shared) -> AnalysisOutcome {
    let PendingFrame {
        frame,
        orientation,
        frame_number,
        snapshot,
    } = pending;
    let kind = snapshot.mode.kind();
    let _span = tracing::debug_span!(
        "analysis.frame",
        frame = frame_number,
        epoch = snapshot.epoch,
        mode = %kind,
        oracle = oracles.oracle_name(kind).unwrap_or("none")
    )
    .entered();

    let started = Instant::now();
    let result = oracles.analyze(&snapshot.mode, &frame);
    metrics::histogram!("vision_oracle_latency_seconds", "mode" => kind.label())
        .record(started.elapsed().as_secs_f64());
    shared.stats.analysed.fetch_add(1, Ordering::Relaxed);

    let (batch, failed) = match result {
        Ok(batch) => {
            trace!(observations = batch.len(), "oracle finished");
            (batch, false)
        }
        Err(err) => {
            shared.stats.failed.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("vision_analysis_failures_total", "mode" => kind.label())
                .increment(1);
            warn!(frame = frame_number, "analysis failed: {err}");
            (Vec::new(), true)
        }
    };

    AnalysisOutcome {
        epoch: snapshot.epoch,
        mode: kind,
        frame_number,
        timestamp_ms: frame.timestamp_ms,
        orientation,
        batch,
        failed,
    }
}

/// Send an outcome to the consumer; `false` when the worker should stop.
fn deliver(shared: &Shared, results: &Sender<AnalysisOutcome>, outcome: AnalysisOutcome) -> bool {
    let mut outcome = outcome;
    loop {
        match results.send_timeout(outcome, RESULT_SEND_POLL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(returned)) => {
                if !shared.is_running() {
                    return false;
                }
                outcome = returned;
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                warn!("result handler dropped; stopping analysis worker");
                return false;
            }
        }
    }
}
