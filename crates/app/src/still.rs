use anyhow::{Context, Result};
use tracing::info;
use vision::{
    OrientationTracker, analyze_still,
    pipeline::{AnalyzeConfig, telemetry},
};

use crate::oracles::build_oracles;

/// Analyse one image file and print the overlay as JSON on stdout.
pub fn run(config: AnalyzeConfig) -> Result<()> {
    let _telemetry_guard = telemetry::enter_runtime(&config.telemetry);

    let frame = video_ingest::load_still_frame(&config.image)
        .with_context(|| format!("Failed to load image {}", config.image.display()))?;
    let oracles = build_oracles(&config.modes)?;
    let tracker = OrientationTracker::new(config.preview.device_orientation);
    let layout = config.preview.layout((frame.width, frame.height));
    let mode = config.modes.initial_mode();

    let overlay = analyze_still(&oracles, &mode, &frame, &tracker, &layout)
        .context("Still image analysis failed")?;
    info!(
        image = %config.image.display(),
        mode = %overlay.mode,
        items = overlay.overlay.len(),
        "analysis complete"
    );
    println!("{}", serde_json::to_string_pretty(&overlay)?);
    Ok(())
}
