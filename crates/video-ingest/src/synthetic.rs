//! Synthetic frame generator used when no camera is attached.
//!
//! Produces BGR frames with a bright rectangle sliding across a dark field so
//! shape oracles have something deterministic to find.

use std::{
    thread,
    time::{Duration, Instant},
};

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::debug;

use crate::types::{CaptureError, Frame, FrameFormat, Orientation};

const BACKGROUND_LEVEL: u8 = 16;
const FOREGROUND_LEVEL: u8 = 235;

/// Settings for [`spawn_synthetic_reader`].
#[derive(Clone, Copy, Debug)]
pub struct SyntheticSource {
    pub size: (i32, i32),
    pub fps: u32,
    pub max_frames: Option<u64>,
    pub orientation: Orientation,
}

/// Spawns a background thread emitting synthetic frames at `fps`.
///
/// The channel holds at most two frames, so the generator stalls when the
/// consumer falls behind, matching the camera readers.
pub fn spawn_synthetic_reader(
    source: SyntheticSource,
) -> Result<Receiver<Result<Frame, CaptureError>>, CaptureError> {
    let (width, height) = source.size;
    if width <= 0 || height <= 0 {
        return Err(CaptureError::DeviceUnavailable {
            uri: format!("synthetic://{width}x{height}"),
            reason: "frame size must be positive".into(),
        });
    }

    let (tx, rx) = bounded(2);
    thread::Builder::new()
        .name("synthetic-source".into())
        .spawn(move || generate_loop(source, tx))
        .map_err(|err| CaptureError::Other(err.into()))?;

    Ok(rx)
}

fn generate_loop(source: SyntheticSource, tx: Sender<Result<Frame, CaptureError>>) {
    let interval = Duration::from_secs_f64(1.0 / source.fps.max(1) as f64);
    let mut index: u64 = 0;
    loop {
        if source.max_frames.is_some_and(|max| index >= max) {
            debug!(frames = index, "synthetic source exhausted");
            break;
        }
        let started = Instant::now();
        let frame = render_frame(source.size, index)
            .with_timestamp(Utc::now().timestamp_millis())
            .with_orientation(source.orientation);
        if tx.send(Ok(frame)).is_err() {
            break;
        }
        index += 1;
        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }
}

/// Render frame `index` of the synthetic sequence.
pub fn render_frame(size: (i32, i32), index: u64) -> Frame {
    let (width, height) = size;
    let (w, h) = (width as usize, height as usize);
    let mut data = vec![BACKGROUND_LEVEL; w * h * 3];

    let (x0, y0, x1, y1) = moving_rect(size, index);
    for y in y0..y1 {
        let row = y * w * 3;
        data[row + x0 * 3..row + x1 * 3].fill(FOREGROUND_LEVEL);
    }

    Frame::new(data, width, height, FrameFormat::Bgr8)
}

/// Pixel bounds `(x0, y0, x1, y1)` of the bright rectangle, half-open.
pub fn moving_rect(size: (i32, i32), index: u64) -> (usize, usize, usize, usize) {
    let (w, h) = (size.0 as usize, size.1 as usize);
    let rect_w = (w / 3).max(1);
    let rect_h = (h / 3).max(1);
    let travel = w - rect_w;
    let x0 = if travel == 0 {
        0
    } else {
        let phase = (index as usize * 4) % (2 * travel);
        if phase <= travel { phase } else { 2 * travel - phase }
    };
    let y0 = (h - rect_h) / 2;
    (x0, y0, x0 + rect_w, y0 + rect_h)
}
