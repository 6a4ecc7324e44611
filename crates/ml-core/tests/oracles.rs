use approx::assert_abs_diff_eq;
use ml_core::{
    ClassifierOracle, ColorClassifier, LuminanceRectangleOracle, OracleError, ShapeOracle,
    ShapeRequest, load_classifier,
};
use video_ingest::{Frame, FrameFormat, moving_rect, render_frame};

fn gray_frame(width: i32, height: i32, bright: &[(i32, i32, i32, i32)]) -> Frame {
    let mut data = vec![0u8; (width * height) as usize];
    for &(x0, y0, x1, y1) in bright {
        for y in y0..y1 {
            for x in x0..x1 {
                data[(y * width + x) as usize] = 255;
            }
        }
    }
    Frame::new(data, width, height, FrameFormat::Gray8)
}

#[test]
fn finds_the_synthetic_rectangle_with_flipped_y() {
    let frame = render_frame((90, 60), 0);
    let (x0, y0, x1, y1) = moving_rect((90, 60), 0);
    let request = ShapeRequest {
        min_relative_size: 0.05,
        max_observations: 4,
    };

    let found = LuminanceRectangleOracle::default()
        .detect_rectangles(&frame, &request)
        .expect("detect");
    assert_eq!(found.len(), 1);

    let rect = &found[0];
    assert_abs_diff_eq!(rect.corners[0].x, x0 as f64 / 90.0, epsilon = 1e-9);
    assert_abs_diff_eq!(rect.corners[0].y, 1.0 - y1 as f64 / 60.0, epsilon = 1e-9);
    assert_abs_diff_eq!(rect.corners[2].x, x1 as f64 / 90.0, epsilon = 1e-9);
    assert_abs_diff_eq!(rect.corners[2].y, 1.0 - y0 as f64 / 60.0, epsilon = 1e-9);
    assert_abs_diff_eq!(rect.confidence, 1.0, epsilon = 1e-6);
}

#[test]
fn ranks_by_size_and_honours_request_limits() {
    let frame = gray_frame(100, 100, &[(0, 0, 10, 10), (20, 20, 60, 60), (70, 70, 95, 95)]);
    let oracle = LuminanceRectangleOracle::default();

    let all = oracle
        .detect_rectangles(
            &frame,
            &ShapeRequest {
                min_relative_size: 0.0,
                max_observations: 10,
            },
        )
        .expect("detect");
    let areas: Vec<f64> = all.iter().map(|r| r.relative_area()).collect();
    assert_eq!(areas.len(), 3);
    assert!(areas.windows(2).all(|w| w[0] >= w[1]));

    let filtered = oracle
        .detect_rectangles(
            &frame,
            &ShapeRequest {
                min_relative_size: 0.05,
                max_observations: 1,
            },
        )
        .expect("detect");
    assert_eq!(filtered.len(), 1);
    assert_abs_diff_eq!(filtered[0].relative_area(), 0.16, epsilon = 1e-9);
}

#[test]
fn regions_below_mid_grey_are_background() {
    let mut data = vec![0u8; 100];
    for y in 0..4 {
        for x in 0..4 {
            data[y * 10 + x] = 127;
            data[(y + 6) * 10 + x + 6] = 128;
        }
    }
    let frame = Frame::new(data, 10, 10, FrameFormat::Gray8);

    let found = LuminanceRectangleOracle::default()
        .detect_rectangles(
            &frame,
            &ShapeRequest {
                min_relative_size: 0.0,
                max_observations: 4,
            },
        )
        .expect("detect");
    assert_eq!(found.len(), 1);
    assert_abs_diff_eq!(found[0].corners[0].x, 0.6, epsilon = 1e-9);
    assert_abs_diff_eq!(found[0].corners[0].y, 0.0, epsilon = 1e-9);
}

#[test]
fn rejects_corrupt_frames() {
    let frame = Frame::new(vec![0; 3], 10, 10, FrameFormat::Gray8);
    let err = LuminanceRectangleOracle::default()
        .detect_rectangles(
            &frame,
            &ShapeRequest {
                min_relative_size: 0.1,
                max_observations: 1,
            },
        )
        .unwrap_err();
    assert!(matches!(err, OracleError::Analysis(_)));
}

#[test]
fn color_classifier_ranks_dominant_channel_first() {
    // Mostly blue in BGR layout.
    let data: Vec<u8> = (0..16).flat_map(|_| [200u8, 40, 10]).collect();
    let frame = Frame::new(data, 4, 4, FrameFormat::Bgr8);

    let ranked = ColorClassifier.classify(&frame).expect("classify");
    assert_eq!(ranked[0].label, "blue");
    assert!(
        ranked
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence)
    );
    assert!(ranked.iter().all(|o| (0.0..=1.0).contains(&o.confidence)));
}

#[test]
fn missing_model_is_unavailable() {
    let err = load_classifier(Some(std::path::Path::new("/nonexistent/model.pt")), None)
        .err()
        .expect("missing model must fail");
    assert!(matches!(err, OracleError::ModelUnavailable(_)));

    assert!(load_classifier(None, None).is_ok());
}
