//! Screen-space overlay built from an accepted result batch.

use ml_core::Observation;
use serde::Serialize;
use video_ingest::Orientation;

use crate::{
    mapper::{Polygon, PreviewLayout, map_rectangle},
    modes::ModeKind,
};

/// Ranked label shown in classification mode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelEntry {
    pub label: String,
    pub confidence: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum Overlay {
    Polygons(Vec<Polygon>),
    Labels(Vec<LabelEntry>),
}

impl Overlay {
    pub fn len(&self) -> usize {
        match self {
            Overlay::Polygons(polygons) => polygons.len(),
            Overlay::Labels(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Overlay plus the metadata of the frame it was computed from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlayFrame {
    pub epoch: u64,
    pub frame_number: u64,
    pub timestamp_ms: i64,
    pub mode: ModeKind,
    pub orientation: &'static str,
    pub overlay: Overlay,
}

/// Consumer of finished overlays; rendering is up to the implementor.
pub trait OverlayPresenter {
    fn present(&mut self, frame: OverlayFrame);
}

impl<F: FnMut(OverlayFrame)> OverlayPresenter for F {
    fn present(&mut self, frame: OverlayFrame) {
        self(frame)
    }
}

/// Map a batch into overlay geometry, keeping batch order.
///
/// Observations that do not belong to `mode` are skipped.
pub fn build_overlay(
    mode: ModeKind,
    batch: &[Observation],
    layout: &PreviewLayout,
    orientation: Orientation,
) -> Overlay {
    match mode {
        ModeKind::Shapes => Overlay::Polygons(
            batch
                .iter()
                .filter_map(|obs| match obs {
                    Observation::Rectangle(rect) => Some(map_rectangle(rect, layout, orientation)),
                    Observation::Classification(_) => None,
                })
                .collect(),
        ),
        ModeKind::Classification => Overlay::Labels(
            batch
                .iter()
                .filter_map(|obs| match obs {
                    Observation::Classification(c) => Some(LabelEntry {
                        label: c.label.clone(),
                        confidence: c.confidence,
                    }),
                    Observation::Rectangle(_) => None,
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use ml_core::{ClassificationObservation, RectangleObservation};

    use super::*;
    use crate::mapper::{FillStrategy, Size};

    fn layout() -> PreviewLayout {
        PreviewLayout {
            view: Size::new(10.0, 10.0),
            fill: FillStrategy::Stretch,
        }
    }

    #[test]
    fn labels_keep_oracle_order() {
        let batch = vec![
            Observation::Classification(ClassificationObservation::new("b", 0.9)),
            Observation::Classification(ClassificationObservation::new("a", 0.4)),
            Observation::Rectangle(RectangleObservation::from_bounds(0.0, 0.0, 1.0, 1.0, 1.0)),
        ];
        let overlay = build_overlay(
            ModeKind::Classification,
            &batch,
            &layout(),
            Orientation::Portrait,
        );
        assert_eq!(
            overlay,
            Overlay::Labels(vec![
                LabelEntry {
                    label: "b".into(),
                    confidence: 0.9
                },
                LabelEntry {
                    label: "a".into(),
                    confidence: 0.4
                },
            ])
        );
    }

    #[test]
    fn overlay_frame_serializes_with_tagged_overlay() {
        let batch = vec![Observation::Rectangle(RectangleObservation::from_bounds(
            0.0, 0.0, 1.0, 1.0, 1.0,
        ))];
        let frame = OverlayFrame {
            epoch: 2,
            frame_number: 9,
            timestamp_ms: 0,
            mode: ModeKind::Shapes,
            orientation: Orientation::Portrait.label(),
            overlay: build_overlay(ModeKind::Shapes, &batch, &layout(), Orientation::Portrait),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["mode"], "shapes");
        assert_eq!(value["orientation"], "portrait");
        assert_eq!(value["overlay"]["kind"], "polygons");
        // Bottom-left of the image lands at the bottom-left of the view.
        assert_eq!(value["overlay"]["items"][0]["vertices"][0]["x"], 0.0);
        assert_eq!(value["overlay"]["items"][0]["vertices"][0]["y"], 10.0);
    }

    #[test]
    fn closures_are_presenters() {
        let mut seen = Vec::new();
        {
            let mut presenter = |frame: OverlayFrame| seen.push(frame.frame_number);
            presenter.present(OverlayFrame {
                epoch: 0,
                frame_number: 4,
                timestamp_ms: 0,
                mode: ModeKind::Shapes,
                orientation: "portrait",
                overlay: Overlay::Polygons(Vec::new()),
            });
        }
        assert_eq!(seen, [4]);
    }
}
