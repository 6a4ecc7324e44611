//! Classifier oracles and the loader used at pipeline startup.

use std::path::Path;

use video_ingest::{Frame, FrameFormat};

use crate::{
    observation::ClassificationObservation,
    oracle::{ClassifierOracle, OracleError},
};

/// Colour-statistics classifier, used when no model is configured.
///
/// Scores the frame against `red`, `green`, `blue` (share of the channel sum)
/// and `bright` (mean luma).
#[derive(Clone, Debug, Default)]
pub struct ColorClassifier;

impl ClassifierOracle for ColorClassifier {
    fn classify(&self, frame: &Frame) -> Result<Vec<ClassificationObservation>, OracleError> {
        frame
            .validate()
            .map_err(|err| OracleError::Analysis(err.to_string()))?;

        let bpp = frame.format.bytes_per_pixel();
        let mut sums = [0u64; 3];
        for px in frame.data.chunks_exact(bpp) {
            let (r, g, b) = match frame.format {
                FrameFormat::Gray8 => (px[0], px[0], px[0]),
                FrameFormat::Bgr8 => (px[2], px[1], px[0]),
                FrameFormat::Rgb8 | FrameFormat::Rgba8 => (px[0], px[1], px[2]),
            };
            sums[0] += r as u64;
            sums[1] += g as u64;
            sums[2] += b as u64;
        }

        let pixels = (frame.data.len() / bpp) as f64;
        let total = (sums[0] + sums[1] + sums[2]) as f64;
        let share = |channel: u64| {
            if total > 0.0 {
                (channel as f64 / total) as f32
            } else {
                0.0
            }
        };
        let luma = (sums[0] as f64 * 0.299 + sums[1] as f64 * 0.587 + sums[2] as f64 * 0.114)
            / (pixels * 255.0);

        let mut ranked = vec![
            ClassificationObservation::new("red", share(sums[0])),
            ClassificationObservation::new("green", share(sums[1])),
            ClassificationObservation::new("blue", share(sums[2])),
            ClassificationObservation::new("bright", luma.clamp(0.0, 1.0) as f32),
        ];
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(ranked)
    }

    fn name(&self) -> &str {
        "color"
    }
}

/// Load the classifier used for classification mode.
///
/// Without a model path the colour classifier is used. A configured model that
/// cannot be loaded is reported as [`OracleError::ModelUnavailable`].
pub fn load_classifier(
    model_path: Option<&Path>,
    labels_path: Option<&Path>,
) -> Result<Box<dyn ClassifierOracle>, OracleError> {
    let Some(model_path) = model_path else {
        return Ok(Box::new(ColorClassifier));
    };
    if !model_path.is_file() {
        return Err(OracleError::ModelUnavailable(format!(
            "model file {} not found",
            model_path.display()
        )));
    }

    #[cfg(feature = "with-tch")]
    {
        let labels = match labels_path {
            Some(path) => read_labels(path)?,
            None => Vec::new(),
        };
        let classifier = crate::detector::TorchClassifier::new(
            model_path,
            labels,
            tch::Device::cuda_if_available(),
        )?;
        Ok(Box::new(classifier))
    }

    #[cfg(not(feature = "with-tch"))]
    {
        let _ = labels_path;
        Err(OracleError::ModelUnavailable(format!(
            "{} requires the `with-tch` feature",
            model_path.display()
        )))
    }
}

/// Read one label per line, skipping blank lines.
pub fn read_labels(path: &Path) -> Result<Vec<String>, OracleError> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        OracleError::ModelUnavailable(format!("labels {}: {err}", path.display()))
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
