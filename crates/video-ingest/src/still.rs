//! Still-image sources: decode a file once and replay it as a stream.

use std::{
    path::Path,
    thread,
    time::Duration,
};

use chrono::Utc;
use crossbeam_channel::{Receiver, bounded};

use crate::types::{CaptureError, Frame, FrameFormat, Orientation};

/// Decode an image file into an RGB frame.
pub fn load_still_frame(path: &Path) -> Result<Frame, CaptureError> {
    let image = image::open(path).map_err(|err| CaptureError::DeviceUnavailable {
        uri: path.display().to_string(),
        reason: err.to_string(),
    })?;
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(
        rgb.into_raw(),
        width as i32,
        height as i32,
        FrameFormat::Rgb8,
    )
    .with_timestamp(Utc::now().timestamp_millis()))
}

/// Spawns a thread that replays the decoded image at `fps`, stamped with
/// `orientation`.
pub fn spawn_still_reader(
    path: &Path,
    fps: u32,
    max_frames: Option<u64>,
    orientation: Orientation,
) -> Result<Receiver<Result<Frame, CaptureError>>, CaptureError> {
    let template = load_still_frame(path)?.with_orientation(orientation);
    let (tx, rx) = bounded(2);
    let interval = Duration::from_secs_f64(1.0 / fps.max(1) as f64);

    thread::Builder::new()
        .name("still-source".into())
        .spawn(move || {
            let mut sent: u64 = 0;
            while max_frames.is_none_or(|max| sent < max) {
                let frame = template
                    .clone()
                    .with_timestamp(Utc::now().timestamp_millis());
                if tx.send(Ok(frame)).is_err() {
                    break;
                }
                sent += 1;
                thread::sleep(interval);
            }
        })
        .map_err(|err| CaptureError::Other(err.into()))?;

    Ok(rx)
}
