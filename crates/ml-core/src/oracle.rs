//! Contracts for the analysis oracles consumed by the pipeline.

use thiserror::Error;
use video_ingest::Frame;

use crate::observation::{ClassificationObservation, RectangleObservation};

/// Options forwarded to a [`ShapeOracle`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeRequest {
    /// Smallest accepted rectangle, as a fraction of the frame area.
    pub min_relative_size: f32,
    /// Upper bound on the number of rectangles returned.
    pub max_observations: usize,
}

/// Rectangle detector.
///
/// Implementations return rectangles ordered by descending confidence or
/// size, at most `max_observations` of them, each covering at least
/// `min_relative_size` of the frame.
pub trait ShapeOracle: Send {
    fn detect_rectangles(
        &self,
        frame: &Frame,
        request: &ShapeRequest,
    ) -> Result<Vec<RectangleObservation>, OracleError>;

    fn name(&self) -> &str {
        "shape"
    }
}

/// Image classifier returning labels sorted by descending confidence.
pub trait ClassifierOracle: Send {
    fn classify(&self, frame: &Frame) -> Result<Vec<ClassificationObservation>, OracleError>;

    fn name(&self) -> &str {
        "classifier"
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("analysis failed: {0}")]
    Analysis(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
