//! Frame sources for the analysis pipeline.
//!
//! Every source runs on its own thread and delivers frames over a small
//! bounded [`Receiver`], so a stalled consumer backpressures the producer
//! instead of growing a queue.

use std::path::Path;

use crossbeam_channel::Receiver;

mod still;
mod synthetic;
mod types;

pub use still::{load_still_frame, spawn_still_reader};
pub use synthetic::{SyntheticSource, moving_rect, render_frame, spawn_synthetic_reader};
pub use types::{CameraIntrinsics, CaptureError, Frame, FrameError, FrameFormat, Orientation};

const SYNTHETIC_SCHEME: &str = "synthetic://";

/// Where frames come from, parsed from a source URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceUri {
    /// `synthetic://WIDTHxHEIGHT`
    Synthetic { width: i32, height: i32 },
    /// Path to an image file replayed as a stream.
    Still(String),
}

impl SourceUri {
    pub fn parse(uri: &str) -> Result<Self, CaptureError> {
        if let Some(spec) = uri.strip_prefix(SYNTHETIC_SCHEME) {
            let (width, height) =
                parse_size(spec).ok_or_else(|| CaptureError::Open { uri: uri.to_string() })?;
            return Ok(SourceUri::Synthetic { width, height });
        }
        if uri.is_empty() {
            return Err(CaptureError::Open { uri: uri.to_string() });
        }
        Ok(SourceUri::Still(uri.to_string()))
    }
}

/// Parse `WIDTHxHEIGHT` into positive dimensions.
pub fn parse_size(spec: &str) -> Option<(i32, i32)> {
    let (w, h) = spec.split_once(['x', 'X'])?;
    let width = w.trim().parse::<i32>().ok()?;
    let height = h.trim().parse::<i32>().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

/// Open a frame source described by `uri`.
///
/// Every frame it delivers carries `orientation` as its capture orientation.
///
/// Failing to open is a startup error: there is nothing to feed the pipeline.
pub fn open_source(
    uri: &str,
    fps: u32,
    max_frames: Option<u64>,
    orientation: Orientation,
) -> Result<Receiver<Result<Frame, CaptureError>>, CaptureError> {
    match SourceUri::parse(uri)? {
        SourceUri::Synthetic { width, height } => spawn_synthetic_reader(SyntheticSource {
            size: (width, height),
            fps,
            max_frames,
            orientation,
        }),
        SourceUri::Still(path) => {
            let path = Path::new(&path);
            if !path.is_file() {
                return Err(CaptureError::DeviceUnavailable {
                    uri: uri.to_string(),
                    reason: "no such file".into(),
                });
            }
            spawn_still_reader(path, fps, max_frames, orientation)
        }
    }
}
