//! Luminance-threshold rectangle finder.
//!
//! Bright connected regions are reported as their axis-aligned bounding boxes.
//! It is a reference oracle for synthetic and still sources, not a general
//! quadrilateral detector.

use image::{GrayImage, Luma};
use tracing::trace;
use video_ingest::Frame;

use crate::{
    observation::RectangleObservation,
    oracle::{OracleError, ShapeOracle, ShapeRequest},
};

const DEFAULT_THRESHOLD: u8 = 128;

#[derive(Clone, Debug)]
pub struct LuminanceRectangleOracle {
    threshold: u8,
}

impl Default for LuminanceRectangleOracle {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Pixel bounds and population of one bright component.
struct Component {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
    pixels: u64,
}

impl Component {
    fn bbox_area(&self) -> u64 {
        (self.x1 - self.x0 + 1) as u64 * (self.y1 - self.y0 + 1) as u64
    }
}

impl LuminanceRectangleOracle {
    fn components(&self, gray: &GrayImage) -> Vec<Component> {
        let (width, height) = gray.dimensions();
        let mut visited = vec![false; (width * height) as usize];
        let mut stack = Vec::new();
        let mut found = Vec::new();

        for start_y in 0..height {
            for start_x in 0..width {
                let start = (start_y * width + start_x) as usize;
                if visited[start] || gray.get_pixel(start_x, start_y)[0] < self.threshold {
                    continue;
                }
                visited[start] = true;
                stack.push((start_x, start_y));
                let mut component = Component {
                    x0: start_x,
                    y0: start_y,
                    x1: start_x,
                    y1: start_y,
                    pixels: 0,
                };

                while let Some((x, y)) = stack.pop() {
                    component.pixels += 1;
                    component.x0 = component.x0.min(x);
                    component.y0 = component.y0.min(y);
                    component.x1 = component.x1.max(x);
                    component.y1 = component.y1.max(y);

                    let neighbours = [
                        (x.wrapping_sub(1), y),
                        (x + 1, y),
                        (x, y.wrapping_sub(1)),
                        (x, y + 1),
                    ];
                    for (nx, ny) in neighbours {
                        if nx >= width || ny >= height {
                            continue;
                        }
                        let idx = (ny * width + nx) as usize;
                        if !visited[idx] && gray.get_pixel(nx, ny)[0] >= self.threshold {
                            visited[idx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
                found.push(component);
            }
        }
        found
    }
}

impl ShapeOracle for LuminanceRectangleOracle {
    fn detect_rectangles(
        &self,
        frame: &Frame,
        request: &ShapeRequest,
    ) -> Result<Vec<RectangleObservation>, OracleError> {
        frame
            .validate()
            .map_err(|err| OracleError::Analysis(err.to_string()))?;

        let (width, height) = (frame.width as u32, frame.height as u32);
        let gray = GrayImage::from_fn(width, height, |x, y| {
            Luma([frame.luma_at(x as i32, y as i32)])
        });

        let frame_area = (width as u64 * height as u64) as f64;
        let mut components: Vec<Component> = self
            .components(&gray)
            .into_iter()
            .filter(|c| c.bbox_area() as f64 / frame_area >= request.min_relative_size as f64)
            .collect();
        components.sort_by(|a, b| b.bbox_area().cmp(&a.bbox_area()));
        components.truncate(request.max_observations);
        trace!(count = components.len(), "luminance components");

        let (w, h) = (width as f64, height as f64);
        Ok(components
            .into_iter()
            .map(|c| {
                let confidence = c.pixels as f32 / c.bbox_area() as f32;
                RectangleObservation::from_bounds(
                    c.x0 as f64 / w,
                    1.0 - (c.y1 + 1) as f64 / h,
                    (c.x1 + 1) as f64 / w,
                    1.0 - c.y0 as f64 / h,
                    confidence,
                )
            })
            .collect())
    }

    fn name(&self) -> &str {
        "luminance-rectangles"
    }
}
