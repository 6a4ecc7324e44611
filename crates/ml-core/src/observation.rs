use serde::Serialize;

/// Point in normalized image space: origin bottom-left, both axes in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Quadrilateral found by a shape oracle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RectangleObservation {
    /// Corners in bottom-left, bottom-right, top-right, top-left order.
    pub corners: [NormalizedPoint; 4],
    pub confidence: f32,
}

impl RectangleObservation {
    /// Axis-aligned rectangle from normalized bounds (bottom-left origin).
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64, confidence: f32) -> Self {
        Self {
            corners: [
                NormalizedPoint::new(min_x, min_y),
                NormalizedPoint::new(max_x, min_y),
                NormalizedPoint::new(max_x, max_y),
                NormalizedPoint::new(min_x, max_y),
            ],
            confidence,
        }
    }

    /// Area as a fraction of the frame (shoelace formula).
    pub fn relative_area(&self) -> f64 {
        let mut twice_area = 0.0;
        for i in 0..4 {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            twice_area += a.x * b.y - b.x * a.y;
        }
        (twice_area / 2.0).abs()
    }
}

/// Label produced by a classifier oracle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationObservation {
    pub label: String,
    pub confidence: f32,
}

impl ClassificationObservation {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// One entry of an oracle result batch.
///
/// Batches keep the oracle's ranking order; nothing downstream reorders them.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    Rectangle(RectangleObservation),
    Classification(ClassificationObservation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_area_of_bounds() {
        let rect = RectangleObservation::from_bounds(0.1, 0.1, 0.9, 0.6, 1.0);
        assert!((rect.relative_area() - 0.4).abs() < 1e-12);
    }
}
