//! Live mode: frame source → analysis pipeline → JSON overlay presenter.

use std::{
    io,
    sync::{
        Arc, Once,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};
use vision::{
    ModeKind, OrientationTracker, PipelineController, SubmitOutcome,
    pipeline::{PipelineConfig, telemetry},
};

use crate::{oracles::build_oracles, presenter::JsonLinesPresenter};

/// How long to let the worker finish the last frame once the source ends.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub fn run(config: PipelineConfig) -> Result<()> {
    static CTRL_HANDLER: Once = Once::new();

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_shutdown = shutdown.clone();
    CTRL_HANDLER.call_once(move || {
        if let Err(err) = ctrlc::set_handler(move || {
            handler_shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!("Failed to install Ctrl+C handler: {err}");
        }
    });

    let _telemetry_guard = telemetry::enter_runtime(&config.telemetry);
    telemetry::init_metrics_recorder();
    let pipeline_span = tracing::info_span!(
        "vision.pipeline",
        source = %config.source_uri,
        fps = config.fps,
        mode = %config.modes.initial,
        switch_every = config.switch_every
    );
    let _pipeline_span_guard = pipeline_span.enter();

    let tracker = OrientationTracker::new(config.preview.device_orientation);
    let receiver = video_ingest::open_source(
        &config.source_uri,
        config.fps,
        config.max_frames,
        tracker.current(),
    )
    .with_context(|| format!("Failed to open frame source {}", config.source_uri))?;
    let oracles = build_oracles(&config.modes)?;

    // The preview layout needs the camera image size.
    let first = match receiver.recv() {
        Ok(Ok(frame)) => frame,
        Ok(Err(err)) => return Err(err).context("Failed to read the first frame"),
        Err(_) => bail!("Frame source closed before delivering a frame"),
    };
    let layout = config.preview.layout((first.width, first.height));
    debug!(
        "Preview {}x{} showing {}x{} frames ({:?})",
        layout.view.width, layout.view.height, first.width, first.height, config.preview.fill
    );

    let (controller, handler) =
        PipelineController::spawn(oracles, config.modes.initial_mode(), layout)
            .context("Failed to start analysis pipeline")?;

    let presenter_shutdown = shutdown.clone();
    let presenter_handle = telemetry::spawn_thread("overlay-presenter", move || {
        let mut presenter = JsonLinesPresenter::new(io::stdout().lock());
        handler.run(&mut presenter, &presenter_shutdown);
        presenter.presented()
    })
    .context("Failed to spawn presenter thread")?;

    info!("Running analysis pipeline; press Ctrl+C to stop");

    let mut active = config.modes.initial;
    let mut frame_count: u64 = 0;
    let mut pending = Some(first);
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let frame = match pending.take() {
            Some(frame) => frame,
            None => match receiver.recv() {
                Ok(Ok(frame)) => frame,
                Ok(Err(err)) => {
                    warn!("Capture error: {err}");
                    continue;
                }
                Err(_) => {
                    debug!("Frame source finished");
                    break;
                }
            },
        };
        frame_count += 1;

        if let Some(every) = config.switch_every {
            if frame_count % every == 0 {
                let next = match active {
                    ModeKind::Shapes => ModeKind::Classification,
                    ModeKind::Classification => ModeKind::Shapes,
                };
                let epoch = controller.set_active_mode(config.modes.mode_for(next))?;
                info!(epoch, mode = %next, frame = frame_count, "Switched analysis mode");
                active = next;
            }
        }

        let orientation = frame.orientation;
        match controller.submit_frame(frame, orientation) {
            SubmitOutcome::Replaced => {
                debug!("Frame #{frame_count} replaced a frame still waiting for analysis")
            }
            SubmitOutcome::Closed => break,
            SubmitOutcome::Queued | SubmitOutcome::Rejected => {}
        }
    }

    let draining = !shutdown.load(Ordering::Relaxed) && controller.is_running();
    if draining && !controller.wait_idle(DRAIN_TIMEOUT) {
        warn!("Analysis worker still busy after {DRAIN_TIMEOUT:?}; stopping anyway");
    }
    let stats = controller.stats();
    controller.shutdown();
    let presented = match presenter_handle.join() {
        Ok(presented) => presented,
        Err(_) => {
            warn!("Presenter thread panicked");
            0
        }
    };

    info!(
        frames = frame_count,
        submitted = stats.submitted,
        replaced = stats.replaced,
        rejected = stats.rejected,
        dropped = stats.closed,
        failed = stats.failed,
        stale = stats.stale,
        presented,
        "Stopping analysis pipeline"
    );

    if config.telemetry.metrics_dump {
        match telemetry::render_metrics() {
            Some(text) => eprint!("{text}"),
            None => warn!("Metrics recorder unavailable; nothing to dump"),
        }
    }
    Ok(())
}
