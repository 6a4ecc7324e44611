//! Frame analysis for a live camera preview.
//!
//! Frames flow from a producer into a [`PipelineController`], which runs the
//! active mode's oracle on a worker thread. Results tagged with the current
//! epoch are mapped into preview coordinates by the [`ResultHandler`] and
//! handed to an [`OverlayPresenter`].

pub mod mapper;
pub mod modes;
pub mod orientation;
pub mod overlay;
pub mod pipeline;
pub mod still;

pub use mapper::{
    FillStrategy, Polygon, PreviewLayout, Rect, ScreenPoint, Size, content_rect, map_point,
    map_rectangle,
};
pub use modes::{AnalysisMode, ClassificationOptions, ModeError, ModeKind, OracleSet, ShapeOptions};
pub use orientation::{DeviceOrientation, OrientationTracker};
pub use overlay::{LabelEntry, Overlay, OverlayFrame, OverlayPresenter, build_overlay};
pub use pipeline::{
    PipelineController, PipelineError, ResultHandler, StatsSnapshot, SubmitOutcome,
};
pub use still::analyze_still;
