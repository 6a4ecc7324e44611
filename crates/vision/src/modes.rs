//! Analysis modes and dispatch to the matching oracle.

use std::fmt;

use ml_core::{
    ClassificationObservation, ClassifierOracle, Observation, OracleError, RectangleObservation,
    ShapeOracle, ShapeRequest,
};
use serde::Serialize;
use thiserror::Error;
use video_ingest::Frame;

#[derive(Debug, Error, PartialEq)]
pub enum ModeError {
    #[error("min relative size must be in (0, 1], got {0}")]
    MinRelativeSize(f32),
    #[error("max observations must be at least 1")]
    MaxObservations,
    #[error("confidence threshold must be in [0, 1], got {0}")]
    ConfidenceThreshold(f32),
    #[error("top-k must be at least 1")]
    TopK,
}

/// Options for shape detection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ShapeOptions {
    min_relative_size: f32,
    max_observations: usize,
}

impl ShapeOptions {
    pub fn new(min_relative_size: f32, max_observations: usize) -> Result<Self, ModeError> {
        if !(min_relative_size > 0.0 && min_relative_size <= 1.0) {
            return Err(ModeError::MinRelativeSize(min_relative_size));
        }
        if max_observations == 0 {
            return Err(ModeError::MaxObservations);
        }
        Ok(Self {
            min_relative_size,
            max_observations,
        })
    }

    pub fn min_relative_size(&self) -> f32 {
        self.min_relative_size
    }

    pub fn max_observations(&self) -> usize {
        self.max_observations
    }

    fn request(&self) -> ShapeRequest {
        ShapeRequest {
            min_relative_size: self.min_relative_size,
            max_observations: self.max_observations,
        }
    }
}

/// Options for classification.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClassificationOptions {
    confidence_threshold: f32,
    top_k: usize,
}

impl ClassificationOptions {
    pub fn new(confidence_threshold: f32, top_k: usize) -> Result<Self, ModeError> {
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(ModeError::ConfidenceThreshold(confidence_threshold));
        }
        if top_k == 0 {
            return Err(ModeError::TopK);
        }
        Ok(Self {
            confidence_threshold,
            top_k,
        })
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

/// The analysis strategy applied to incoming frames.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AnalysisMode {
    ShapeDetection(ShapeOptions),
    Classification(ClassificationOptions),
}

/// Mode discriminant, used for labels and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Shapes,
    Classification,
}

impl ModeKind {
    pub fn label(self) -> &'static str {
        match self {
            ModeKind::Shapes => "shapes",
            ModeKind::Classification => "classification",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl AnalysisMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            AnalysisMode::ShapeDetection(_) => ModeKind::Shapes,
            AnalysisMode::Classification(_) => ModeKind::Classification,
        }
    }
}

/// Oracles installed at startup, at most one per mode.
#[derive(Default)]
pub struct OracleSet {
    shapes: Option<Box<dyn ShapeOracle>>,
    classifier: Option<Box<dyn ClassifierOracle>>,
}

impl OracleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shapes(mut self, oracle: impl ShapeOracle + 'static) -> Self {
        self.shapes = Some(Box::new(oracle));
        self
    }

    pub fn with_classifier(mut self, oracle: impl ClassifierOracle + 'static) -> Self {
        self.classifier = Some(Box::new(oracle));
        self
    }

    pub fn with_boxed_classifier(mut self, oracle: Box<dyn ClassifierOracle>) -> Self {
        self.classifier = Some(oracle);
        self
    }

    pub fn supports(&self, kind: ModeKind) -> bool {
        match kind {
            ModeKind::Shapes => self.shapes.is_some(),
            ModeKind::Classification => self.classifier.is_some(),
        }
    }

    /// Name of the oracle serving `kind`, for logs.
    pub fn oracle_name(&self, kind: ModeKind) -> Option<&str> {
        match kind {
            ModeKind::Shapes => self.shapes.as_deref().map(|o| o.name()),
            ModeKind::Classification => self.classifier.as_deref().map(|o| o.name()),
        }
    }

    /// Run the oracle for `mode` and apply the consumer-side limits.
    pub fn analyze(
        &self,
        mode: &AnalysisMode,
        frame: &Frame,
    ) -> Result<Vec<Observation>, OracleError> {
        let kind = mode.kind();
        let _span = tracing::trace_span!(
            "oracle.call",
            oracle = self.oracle_name(kind).unwrap_or("none")
        )
        .entered();
        match mode {
            AnalysisMode::ShapeDetection(options) => {
                let oracle = self.shapes.as_deref().ok_or_else(|| {
                    OracleError::ModelUnavailable("no shape oracle installed".into())
                })?;
                let found = oracle.detect_rectangles(frame, &options.request())?;
                Ok(cap_rectangles(found, options)
                    .into_iter()
                    .map(Observation::Rectangle)
                    .collect())
            }
            AnalysisMode::Classification(options) => {
                let oracle = self.classifier.as_deref().ok_or_else(|| {
                    OracleError::ModelUnavailable("no classifier installed".into())
                })?;
                let ranked = oracle.classify(frame)?;
                Ok(filter_classifications(ranked, options)
                    .into_iter()
                    .map(Observation::Classification)
                    .collect())
            }
        }
    }
}

/// Keep at most `max_observations` rectangles, in oracle order.
///
/// The oracle promises the cap already; this keeps the overlay bounded when it
/// does not.
pub fn cap_rectangles(
    mut found: Vec<RectangleObservation>,
    options: &ShapeOptions,
) -> Vec<RectangleObservation> {
    found.truncate(options.max_observations);
    found
}

/// Keep labels strictly above the threshold, then the first `top_k`, in order.
pub fn filter_classifications(
    ranked: Vec<ClassificationObservation>,
    options: &ClassificationOptions,
) -> Vec<ClassificationObservation> {
    ranked
        .into_iter()
        .filter(|obs| obs.confidence > options.confidence_threshold)
        .take(options.top_k)
        .collect()
}
