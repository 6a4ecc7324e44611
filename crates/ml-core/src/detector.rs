use std::{convert::TryFrom, path::Path};

use image::{RgbImage, imageops::FilterType};
use tch::{self, Device, Kind, Tensor};
use video_ingest::{Frame, FrameFormat};

use crate::{
    observation::ClassificationObservation,
    oracle::{ClassifierOracle, OracleError},
};

const DEFAULT_INPUT_SIZE: (i64, i64) = (224, 224);

/// TorchScript-backed image classifier.
///
/// The module is expected to take a `[1, 3, H, W]` float tensor in `[0, 1]`
/// and return one logit per class.
pub struct TorchClassifier {
    module: tch::CModule,
    device: Device,
    input_size: (i64, i64),
    labels: Vec<String>,
}

impl TorchClassifier {
    /// Load a TorchScript module on `device`.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        labels: Vec<String>,
        device: Device,
    ) -> Result<Self, OracleError> {
        let module = tch::CModule::load_on_device(model_path.as_ref(), device).map_err(|err| {
            OracleError::ModelUnavailable(format!(
                "failed to load {}: {err}",
                model_path.as_ref().display()
            ))
        })?;
        Ok(Self {
            module,
            device,
            input_size: DEFAULT_INPUT_SIZE,
            labels,
        })
    }

    /// Override the network input size (width, height).
    pub fn with_input_size(mut self, input_size: (i64, i64)) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Resize the frame to the network input and build a normalized NCHW tensor.
    fn frame_to_tensor(&self, frame: &Frame) -> Result<Tensor, OracleError> {
        let rgb: Vec<u8> = match frame.format {
            FrameFormat::Rgb8 => frame.data.clone(),
            FrameFormat::Bgr8 => frame
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
            FrameFormat::Rgba8 => frame
                .data
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
            FrameFormat::Gray8 => frame.data.iter().flat_map(|&v| [v, v, v]).collect(),
        };
        let image = RgbImage::from_raw(frame.width as u32, frame.height as u32, rgb)
            .ok_or_else(|| OracleError::Analysis("frame buffer does not match its size".into()))?;

        let (in_w, in_h) = self.input_size;
        let resized =
            image::imageops::resize(&image, in_w as u32, in_h as u32, FilterType::Triangle);

        let tensor = Tensor::from_slice(resized.as_raw())
            .to_device(self.device)
            .to_kind(Kind::Float)
            .view([1, in_h, in_w, 3])
            .permute([0, 3, 1, 2])
            / 255.0;
        Ok(tensor)
    }

    fn label_for(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class_{index}"))
    }
}

impl ClassifierOracle for TorchClassifier {
    fn classify(&self, frame: &Frame) -> Result<Vec<ClassificationObservation>, OracleError> {
        frame
            .validate()
            .map_err(|err| OracleError::Analysis(err.to_string()))?;
        let input = self.frame_to_tensor(frame)?;

        let output = self
            .module
            .forward_ts(&[input])
            .map_err(|err| OracleError::Analysis(err.to_string()))?;
        let shape = output.size();
        if shape.len() != 2 || shape[0] != 1 {
            return Err(OracleError::Analysis(format!(
                "unexpected classifier output shape: {shape:?}"
            )));
        }

        let probs = output
            .softmax(-1, Kind::Float)
            .to_device(Device::Cpu)
            .squeeze_dim(0)
            .contiguous();
        let scores: Vec<f32> =
            Vec::<f32>::try_from(&probs).map_err(|err| OracleError::Analysis(err.to_string()))?;

        let mut ranked: Vec<ClassificationObservation> = scores
            .into_iter()
            .enumerate()
            .map(|(idx, score)| ClassificationObservation::new(self.label_for(idx), score))
            .collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(ranked)
    }

    fn name(&self) -> &str {
        "torchscript"
    }
}
