//! One-shot analysis of a single frame outside the live pipeline.

use ml_core::OracleError;
use tracing::debug;
use video_ingest::Frame;

use crate::{
    mapper::PreviewLayout,
    modes::{AnalysisMode, OracleSet},
    orientation::OrientationTracker,
    overlay::{OverlayFrame, build_overlay},
};

/// Analyse `frame` with `mode` and map the result into `layout`.
///
/// The capture orientation comes from `tracker`, the same source the live
/// pipeline uses. Oracle failures are returned rather than turned into an
/// empty overlay.
pub fn analyze_still(
    oracles: &OracleSet,
    mode: &AnalysisMode,
    frame: &Frame,
    tracker: &OrientationTracker,
    layout: &PreviewLayout,
) -> Result<OverlayFrame, OracleError> {
    frame
        .validate()
        .map_err(|err| OracleError::Analysis(err.to_string()))?;
    let orientation = tracker.current();
    let kind = mode.kind();
    let _span = tracing::debug_span!("analysis.still", mode = %kind).entered();

    let batch = oracles.analyze(mode, frame)?;
    debug!(
        observations = batch.len(),
        orientation = orientation.label(),
        "still image analysed"
    );
    Ok(OverlayFrame {
        epoch: 0,
        frame_number: 1,
        timestamp_ms: frame.timestamp_ms,
        mode: kind,
        orientation: orientation.label(),
        overlay: build_overlay(kind, &batch, layout, orientation),
    })
}
