use anyhow::{Context, Result};
use ml_core::{LuminanceRectangleOracle, load_classifier};
use tracing::debug;
use vision::{ModeKind, OracleSet, pipeline::ModeSettings};

/// Install the shape finder and the configured classifier.
pub fn build_oracles(modes: &ModeSettings) -> Result<OracleSet> {
    let classifier = load_classifier(modes.model_path.as_deref(), modes.labels_path.as_deref())
        .context("Failed to load classifier")?;
    let oracles = OracleSet::new()
        .with_shapes(LuminanceRectangleOracle::default())
        .with_boxed_classifier(classifier);
    debug!(
        shapes = oracles.oracle_name(ModeKind::Shapes).unwrap_or("none"),
        classifier = oracles.oracle_name(ModeKind::Classification).unwrap_or("none"),
        "oracles ready"
    );
    Ok(oracles)
}
