//! Observation model and the analysis oracles the pipeline dispatches to.
//!
//! Oracles are black boxes to the pipeline: a frame goes in, a ranked batch of
//! observations comes out. The reference implementations here keep the
//! workspace runnable without a model; enable `with-tch` for the TorchScript
//! classifier.

pub mod classifier;
#[cfg(feature = "with-tch")]
pub mod detector;
pub mod observation;
pub mod oracle;
pub mod shapes;

pub use classifier::{ColorClassifier, load_classifier};
pub use observation::{
    ClassificationObservation, NormalizedPoint, Observation, RectangleObservation,
};
pub use oracle::{ClassifierOracle, OracleError, ShapeOracle, ShapeRequest};
pub use shapes::LuminanceRectangleOracle;

#[cfg(feature = "with-tch")]
pub use tch;
