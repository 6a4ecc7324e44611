//! Normalized observation geometry to screen-space overlay geometry.
//!
//! Oracles report points relative to the upright camera image with a
//! bottom-left origin. The preview surface is portrait-fixed with a top-left
//! origin, shows the camera image through a fill strategy, and may crop it.
//! Mapping is a pure function of the point, the preview size, the capture
//! orientation and the fill strategy:
//!
//! 1. flip Y (`v = 1 - y`),
//! 2. rotate the normalized point into portrait screen axes,
//! 3. scale and offset through the content rectangle of the fill strategy.

use ml_core::{NormalizedPoint, RectangleObservation};
use serde::Serialize;
use video_ingest::Orientation;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_empty(self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }
}

/// Screen-space point in view pixels, top-left origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned rectangle in view pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }
}

/// How the camera image is laid out inside the preview.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FillStrategy {
    /// Scale each axis independently to the view.
    Stretch,
    /// Preserve aspect ratio and fill the view, cropping the excess.
    AspectFill { image: Size },
    /// Preserve aspect ratio and fit inside the view, letterboxing.
    AspectFit { image: Size },
}

/// Consumer-side preview geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewLayout {
    pub view: Size,
    pub fill: FillStrategy,
}

/// Closed overlay polygon for one rectangle observation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Polygon {
    pub vertices: [ScreenPoint; 4],
}

impl Polygon {
    /// Vertices with the first repeated at the end.
    pub fn closed_path(&self) -> impl Iterator<Item = ScreenPoint> + '_ {
        self.vertices.iter().copied().chain(std::iter::once(self.vertices[0]))
    }
}

/// Region of the view covered by the (possibly cropped) camera image.
///
/// With aspect-fill the rectangle extends past the view on one axis; its
/// negative offset is the cropped margin.
pub fn content_rect(preview: Size, orientation: Orientation, fill: FillStrategy) -> Rect {
    let full = Rect {
        x: 0.0,
        y: 0.0,
        width: preview.width,
        height: preview.height,
    };
    let (image, fill_view) = match fill {
        FillStrategy::Stretch => return full,
        FillStrategy::AspectFill { image } => (image, true),
        FillStrategy::AspectFit { image } => (image, false),
    };
    if image.is_empty() || preview.is_empty() {
        return full;
    }

    let oriented = if orientation.is_landscape() {
        image.transposed()
    } else {
        image
    };
    let scale_x = preview.width / oriented.width;
    let scale_y = preview.height / oriented.height;
    let scale = if fill_view {
        scale_x.max(scale_y)
    } else {
        scale_x.min(scale_y)
    };

    let width = oriented.width * scale;
    let height = oriented.height * scale;
    Rect {
        x: (preview.width - width) / 2.0,
        y: (preview.height - height) / 2.0,
        width,
        height,
    }
}

/// Rotate a flipped (top-left origin) normalized point into portrait screen axes.
fn rotate(u: f64, v: f64, orientation: Orientation) -> (f64, f64) {
    match orientation {
        Orientation::Portrait => (u, v),
        Orientation::PortraitUpsideDown => (1.0 - u, 1.0 - v),
        Orientation::LandscapeLeft => (1.0 - v, u),
        Orientation::LandscapeRight => (v, 1.0 - u),
    }
}

/// Map one normalized image point to view pixels.
pub fn map_point(
    point: NormalizedPoint,
    preview: Size,
    orientation: Orientation,
    fill: FillStrategy,
) -> ScreenPoint {
    let (u, v) = (point.x, 1.0 - point.y);
    let (sx, sy) = rotate(u, v, orientation);
    let content = content_rect(preview, orientation, fill);
    ScreenPoint {
        x: content.x + sx * content.width,
        y: content.y + sy * content.height,
    }
}

/// Map all four corners of a rectangle observation.
pub fn map_rectangle(
    rect: &RectangleObservation,
    layout: &PreviewLayout,
    orientation: Orientation,
) -> Polygon {
    Polygon {
        vertices: rect
            .corners
            .map(|corner| map_point(corner, layout.view, orientation, layout.fill)),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const ORIENTATIONS: [Orientation; 4] = [
        Orientation::Portrait,
        Orientation::PortraitUpsideDown,
        Orientation::LandscapeLeft,
        Orientation::LandscapeRight,
    ];

    #[test]
    fn stretch_flips_y_only_in_portrait() {
        let p = map_point(
            NormalizedPoint::new(0.25, 0.25),
            Size::new(200.0, 100.0),
            Orientation::Portrait,
            FillStrategy::Stretch,
        );
        assert_abs_diff_eq!(p.x, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn aspect_fill_crops_the_wider_axis() {
        let rect = content_rect(
            Size::new(400.0, 800.0),
            Orientation::Portrait,
            FillStrategy::AspectFill {
                image: Size::new(1080.0, 1920.0),
            },
        );
        assert_abs_diff_eq!(rect.x, -25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rect.y, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rect.width, 450.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rect.height, 800.0, epsilon = 1e-9);
    }

    #[test]
    fn aspect_fit_letterboxes() {
        let rect = content_rect(
            Size::new(400.0, 800.0),
            Orientation::Portrait,
            FillStrategy::AspectFit {
                image: Size::new(640.0, 480.0),
            },
        );
        assert_abs_diff_eq!(rect.width, 400.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rect.height, 300.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rect.y, 250.0, epsilon = 1e-9);
    }

    #[test]
    fn landscape_swaps_image_extent() {
        let fill = FillStrategy::AspectFit {
            image: Size::new(640.0, 480.0),
        };
        let rect = content_rect(Size::new(400.0, 800.0), Orientation::LandscapeRight, fill);
        // 480x640 after the swap, fitted to 400 wide.
        assert_abs_diff_eq!(rect.width, 400.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rect.height, 400.0 * 640.0 / 480.0, epsilon = 1e-9);
    }

    #[test]
    fn orientation_moves_the_top_left_corner() {
        let view = Size::new(100.0, 100.0);
        // Image top-left in bottom-left-origin coordinates.
        let top_left = NormalizedPoint::new(0.0, 1.0);
        let expected = [
            (Orientation::Portrait, (0.0, 0.0)),
            (Orientation::PortraitUpsideDown, (100.0, 100.0)),
            (Orientation::LandscapeLeft, (100.0, 0.0)),
            (Orientation::LandscapeRight, (0.0, 100.0)),
        ];
        for (orientation, (x, y)) in expected {
            let p = map_point(top_left, view, orientation, FillStrategy::Stretch);
            assert_abs_diff_eq!(p.x, x, epsilon = 1e-9);
            assert_abs_diff_eq!(p.y, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn center_maps_to_crop_center_for_every_orientation() {
        let view = Size::new(500.0, 500.0);
        let fills = [
            FillStrategy::Stretch,
            FillStrategy::AspectFill {
                image: Size::new(1920.0, 1080.0),
            },
            FillStrategy::AspectFit {
                image: Size::new(1920.0, 1080.0),
            },
        ];
        for fill in fills {
            for orientation in ORIENTATIONS {
                let center = content_rect(view, orientation, fill).center();
                let p = map_point(NormalizedPoint::new(0.5, 0.5), view, orientation, fill);
                assert_abs_diff_eq!(p.x, center.x, epsilon = 1e-9);
                assert_abs_diff_eq!(p.y, center.y, epsilon = 1e-9);
                assert_abs_diff_eq!(p.x, 250.0, epsilon = 1e-9);
                assert_abs_diff_eq!(p.y, 250.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn polygon_path_is_closed() {
        let layout = PreviewLayout {
            view: Size::new(10.0, 10.0),
            fill: FillStrategy::Stretch,
        };
        let rect = RectangleObservation::from_bounds(0.0, 0.0, 1.0, 1.0, 1.0);
        let polygon = map_rectangle(&rect, &layout, Orientation::Portrait);
        let path: Vec<_> = polygon.closed_path().collect();
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), path.last());
    }

    #[test]
    fn empty_image_size_falls_back_to_full_view() {
        let rect = content_rect(
            Size::new(300.0, 200.0),
            Orientation::Portrait,
            FillStrategy::AspectFill {
                image: Size::new(0.0, 0.0),
            },
        );
        assert_eq!(
            rect,
            Rect {
                x: 0.0,
                y: 0.0,
                width: 300.0,
                height: 200.0
            }
        );
    }
}
