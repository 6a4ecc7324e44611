use thiserror::Error;

/// Raw frame captured from a video source.
///
/// Frames are immutable once built and move into the analysis pipeline by
/// value; the pixel buffer is released when analysis of the frame finishes.
#[derive(Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: i32,
    pub height: i32,
    pub timestamp_ms: i64,
    pub format: FrameFormat,
    /// Orientation of the device when the frame was captured.
    pub orientation: Orientation,
    /// Camera intrinsic calibration, when the source provides one.
    pub intrinsics: Option<CameraIntrinsics>,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: i32, height: i32, format: FrameFormat) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ms: 0,
            format,
            orientation: Orientation::Portrait,
            intrinsics: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_intrinsics(mut self, intrinsics: CameraIntrinsics) -> Self {
        self.intrinsics = Some(intrinsics);
        self
    }

    /// Check that the frame carries a pixel buffer matching its geometry.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.data.is_empty() {
            return Err(FrameError::MissingBuffer);
        }
        if self.width <= 0 || self.height <= 0 {
            return Err(FrameError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let expected =
            self.width as usize * self.height as usize * self.format.bytes_per_pixel();
        if self.data.len() != expected {
            return Err(FrameError::SizeMismatch {
                actual: self.data.len(),
                expected,
            });
        }
        Ok(())
    }

    /// Luma of the pixel at `(x, y)`, top-left origin.
    pub fn luma_at(&self, x: i32, y: i32) -> u8 {
        let bpp = self.format.bytes_per_pixel();
        let idx = (y as usize * self.width as usize + x as usize) * bpp;
        let px = &self.data[idx..idx + bpp];
        match self.format {
            FrameFormat::Gray8 => px[0],
            FrameFormat::Bgr8 => luma(px[2], px[1], px[0]),
            FrameFormat::Rgb8 | FrameFormat::Rgba8 => luma(px[0], px[1], px[2]),
        }
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameFormat {
    Bgr8,
    Rgb8,
    Rgba8,
    Gray8,
}

impl FrameFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            FrameFormat::Bgr8 | FrameFormat::Rgb8 => 3,
            FrameFormat::Rgba8 => 4,
            FrameFormat::Gray8 => 1,
        }
    }
}

/// Canonical capture orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl Orientation {
    pub fn label(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::PortraitUpsideDown => "portrait-upside-down",
            Orientation::LandscapeLeft => "landscape-left",
            Orientation::LandscapeRight => "landscape-right",
        }
    }

    /// Whether image axes are swapped relative to a portrait screen.
    pub fn is_landscape(self) -> bool {
        matches!(
            self,
            Orientation::LandscapeLeft | Orientation::LandscapeRight
        )
    }
}

/// Pinhole intrinsics, row-major 3x3 camera matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraIntrinsics {
    pub matrix: [[f64; 3]; 3],
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            matrix: [[fx, 0.0, cx], [0.0, fy, cy], [0.0, 0.0, 1.0]],
        }
    }

    pub fn focal_length(&self) -> (f64, f64) {
        (self.matrix[0][0], self.matrix[1][1])
    }

    pub fn principal_point(&self) -> (f64, f64) {
        (self.matrix[0][2], self.matrix[1][2])
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame has no pixel buffer")]
    MissingBuffer,
    #[error("frame dimensions {width}x{height} are not positive")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    SizeMismatch { actual: usize, expected: usize },
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open video source {uri:?}")]
    Open { uri: String },
    #[error("no capture device available for {uri:?}: {reason}")]
    DeviceUnavailable { uri: String, reason: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_missing_and_short_buffers() {
        let empty = Frame::new(Vec::new(), 4, 4, FrameFormat::Rgb8);
        assert_eq!(empty.validate(), Err(FrameError::MissingBuffer));

        let short = Frame::new(vec![0; 10], 4, 4, FrameFormat::Rgb8);
        assert_eq!(
            short.validate(),
            Err(FrameError::SizeMismatch {
                actual: 10,
                expected: 48
            })
        );

        let ok = Frame::new(vec![0; 16], 4, 4, FrameFormat::Gray8);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn luma_reads_bgr_channel_order() {
        // Pure red in BGR layout.
        let frame = Frame::new(vec![0, 0, 255], 1, 1, FrameFormat::Bgr8);
        assert_eq!(frame.luma_at(0, 0), 76);
    }

    #[test]
    fn intrinsics_expose_focal_and_principal_point() {
        let k = CameraIntrinsics::new(800.0, 810.0, 320.0, 240.0);
        assert_eq!(k.focal_length(), (800.0, 810.0));
        assert_eq!(k.principal_point(), (320.0, 240.0));
    }
}
