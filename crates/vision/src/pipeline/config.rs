//! Configuration parsing for the analysis pipeline.
//!
//! This module owns translation of CLI arguments into validated settings
//! structs which downstream stages use without re-parsing flags.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, ValueEnum};

use crate::{
    mapper::{FillStrategy, PreviewLayout, Size},
    modes::{AnalysisMode, ClassificationOptions, ModeKind, ShapeOptions},
    orientation::DeviceOrientation,
};

const DEFAULT_SOURCE: &str = "synthetic://640x480";
const DEFAULT_PREVIEW: &str = "390x844";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
/// Analysis mode selectable from the command line.
pub enum ModeChoice {
    Shapes,
    Classify,
}

impl From<ModeChoice> for ModeKind {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Shapes => ModeKind::Shapes,
            ModeChoice::Classify => ModeKind::Classification,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
/// How the preview shows the camera image.
pub enum FillMode {
    /// Preserve aspect ratio, crop to fill the view.
    Fill,
    /// Preserve aspect ratio, letterbox inside the view.
    Fit,
    /// Scale axes independently.
    Stretch,
}

#[derive(Clone, Debug, Default)]
/// Optional telemetry knobs for tracing and metrics.
pub struct TelemetryOptions {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    pub verbose: bool,
    /// Write a Chrome trace JSON file capturing pipeline spans.
    pub chrome_trace_path: Option<PathBuf>,
    /// Print the Prometheus exposition on exit.
    pub metrics_dump: bool,
}

/// Mode options shared by every subcommand.
#[derive(Debug, Args)]
pub struct ModeCliArgs {
    /// Initial analysis mode.
    #[arg(long = "mode", value_enum, default_value_t = ModeChoice::Shapes)]
    pub mode: ModeChoice,
    /// Smallest rectangle accepted, as a fraction of the frame area (0-1].
    #[arg(long = "min-relative-size", value_name = "FRACTION", default_value_t = 0.05)]
    pub min_relative_size: f32,
    /// Maximum rectangles rendered per frame.
    #[arg(long = "max-observations", value_name = "N", default_value_t = 4)]
    pub max_observations: usize,
    /// Labels must score strictly above this value [0-1].
    #[arg(long = "confidence-threshold", value_name = "SCORE", default_value_t = 0.1)]
    pub confidence_threshold: f32,
    /// Maximum labels rendered per frame.
    #[arg(long = "top-k", value_name = "N", default_value_t = 3)]
    pub top_k: usize,
    /// TorchScript classifier (requires the `with-tch` feature).
    #[arg(long = "model", value_name = "PATH")]
    pub model_path: Option<PathBuf>,
    /// Class labels for the classifier, one per line.
    #[arg(long = "labels", value_name = "PATH", requires = "model_path")]
    pub labels_path: Option<PathBuf>,
}

/// Preview geometry shared by every subcommand.
#[derive(Debug, Args)]
pub struct PreviewCliArgs {
    /// Preview size in pixels.
    #[arg(long = "preview", value_name = "WIDTHxHEIGHT", default_value = DEFAULT_PREVIEW)]
    pub preview: String,
    /// How the camera image fills the preview.
    #[arg(long = "fill", value_enum, default_value_t = FillMode::Fill)]
    pub fill: FillMode,
    /// Raw device orientation signal.
    #[arg(long = "device-orientation", value_enum, default_value_t = DeviceOrientation::Portrait)]
    pub device_orientation: DeviceOrientation,
}

/// CLI arguments accepted by the `live` subcommand.
#[derive(Debug, Args)]
pub struct PipelineCliArgs {
    /// Frame source: `synthetic://WIDTHxHEIGHT` or an image file.
    #[arg(long = "source", value_name = "URI", default_value = DEFAULT_SOURCE)]
    pub source_uri: String,
    /// Source frame rate.
    #[arg(long = "fps", value_name = "N", default_value_t = 30)]
    pub fps: u32,
    /// Stop after this many frames.
    #[arg(long = "max-frames", value_name = "N")]
    pub max_frames: Option<u64>,
    /// Alternate between modes every N frames.
    #[arg(long = "switch-every", value_name = "N")]
    pub switch_every: Option<u64>,
    #[command(flatten)]
    pub mode: ModeCliArgs,
    #[command(flatten)]
    pub preview: PreviewCliArgs,
    /// Enable verbose logging (mode switches, dropped frames).
    #[arg(long = "verbose", action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
    /// Emit Chrome trace JSON for post-mortem analysis.
    #[arg(long = "chrome-trace", value_name = "PATH")]
    pub chrome_trace: Option<PathBuf>,
    /// Print Prometheus metrics on exit.
    #[arg(long = "metrics-dump", action = clap::ArgAction::SetTrue)]
    pub metrics_dump: bool,
}

/// CLI arguments accepted by the `analyze` subcommand.
#[derive(Debug, Args)]
pub struct AnalyzeCliArgs {
    /// Image file to analyse.
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,
    #[command(flatten)]
    pub mode: ModeCliArgs,
    #[command(flatten)]
    pub preview: PreviewCliArgs,
    /// Enable verbose logging.
    #[arg(long = "verbose", action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

/// Validated options for both modes plus the initial selection.
#[derive(Clone, Debug)]
pub struct ModeSettings {
    pub initial: ModeKind,
    pub shapes: ShapeOptions,
    pub classification: ClassificationOptions,
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
}

impl ModeSettings {
    pub fn mode_for(&self, kind: ModeKind) -> AnalysisMode {
        match kind {
            ModeKind::Shapes => AnalysisMode::ShapeDetection(self.shapes),
            ModeKind::Classification => AnalysisMode::Classification(self.classification),
        }
    }

    pub fn initial_mode(&self) -> AnalysisMode {
        self.mode_for(self.initial)
    }
}

impl TryFrom<ModeCliArgs> for ModeSettings {
    type Error = anyhow::Error;

    fn try_from(args: ModeCliArgs) -> Result<Self> {
        let shapes = ShapeOptions::new(args.min_relative_size, args.max_observations)
            .context("invalid shape detection options")?;
        let classification = ClassificationOptions::new(args.confidence_threshold, args.top_k)
            .context("invalid classification options")?;
        Ok(Self {
            initial: args.mode.into(),
            shapes,
            classification,
            model_path: args.model_path,
            labels_path: args.labels_path,
        })
    }
}

/// Validated preview geometry.
#[derive(Clone, Copy, Debug)]
pub struct PreviewSettings {
    pub view: Size,
    pub fill: FillMode,
    pub device_orientation: DeviceOrientation,
}

impl PreviewSettings {
    /// Layout for a camera image of `image_size` pixels.
    pub fn layout(&self, image_size: (i32, i32)) -> PreviewLayout {
        let image = Size::new(image_size.0 as f64, image_size.1 as f64);
        let fill = match self.fill {
            FillMode::Fill => FillStrategy::AspectFill { image },
            FillMode::Fit => FillStrategy::AspectFit { image },
            FillMode::Stretch => FillStrategy::Stretch,
        };
        PreviewLayout {
            view: self.view,
            fill,
        }
    }
}

impl TryFrom<PreviewCliArgs> for PreviewSettings {
    type Error = anyhow::Error;

    fn try_from(args: PreviewCliArgs) -> Result<Self> {
        let (width, height) = video_ingest::parse_size(&args.preview).ok_or_else(|| {
            anyhow!(
                "Invalid preview size {:?}. Expected WIDTHxHEIGHT with positive integers.",
                args.preview
            )
        })?;
        Ok(Self {
            view: Size::new(width as f64, height as f64),
            fill: args.fill,
            device_orientation: args.device_orientation,
        })
    }
}

#[derive(Clone, Debug)]
/// Canonical configuration for a live pipeline run.
pub struct PipelineConfig {
    pub source_uri: String,
    pub fps: u32,
    pub max_frames: Option<u64>,
    pub switch_every: Option<u64>,
    pub modes: ModeSettings,
    pub preview: PreviewSettings,
    pub telemetry: TelemetryOptions,
}

impl TryFrom<PipelineCliArgs> for PipelineConfig {
    type Error = anyhow::Error;

    fn try_from(args: PipelineCliArgs) -> Result<Self> {
        if args.source_uri.trim().is_empty() {
            bail!("--source must not be empty");
        }
        if !(1..=240).contains(&args.fps) {
            bail!("--fps must be an integer between 1 and 240");
        }
        if args.max_frames == Some(0) {
            bail!("--max-frames must be at least 1");
        }
        if args.switch_every == Some(0) {
            bail!("--switch-every must be at least 1");
        }

        Ok(Self {
            source_uri: args.source_uri,
            fps: args.fps,
            max_frames: args.max_frames,
            switch_every: args.switch_every,
            modes: ModeSettings::try_from(args.mode)?,
            preview: PreviewSettings::try_from(args.preview)?,
            telemetry: TelemetryOptions {
                verbose: args.verbose,
                chrome_trace_path: args.chrome_trace,
                metrics_dump: args.metrics_dump,
            },
        })
    }
}

#[derive(Clone, Debug)]
/// Configuration for a one-shot still image analysis.
pub struct AnalyzeConfig {
    pub image: PathBuf,
    pub modes: ModeSettings,
    pub preview: PreviewSettings,
    pub telemetry: TelemetryOptions,
}

impl TryFrom<AnalyzeCliArgs> for AnalyzeConfig {
    type Error = anyhow::Error;

    fn try_from(args: AnalyzeCliArgs) -> Result<Self> {
        Ok(Self {
            image: args.image,
            modes: ModeSettings::try_from(args.mode)?,
            preview: PreviewSettings::try_from(args.preview)?,
            telemetry: TelemetryOptions {
                verbose: args.verbose,
                ..TelemetryOptions::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct LiveCli {
        #[command(flatten)]
        args: PipelineCliArgs,
    }

    fn parse(args: &[&str]) -> Result<PipelineConfig> {
        let cli = LiveCli::try_parse_from(std::iter::once("live").chain(args.iter().copied()))?;
        PipelineConfig::try_from(cli.args)
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&[]).expect("defaults");
        assert_eq!(config.source_uri, DEFAULT_SOURCE);
        assert_eq!(config.modes.initial, ModeKind::Shapes);
        assert_eq!(config.modes.shapes.max_observations(), 4);
        assert_eq!(config.modes.classification.top_k(), 3);
        assert_eq!(config.preview.view, Size::new(390.0, 844.0));
        assert_eq!(config.preview.device_orientation, DeviceOrientation::Portrait);
    }

    #[test]
    fn parses_mode_and_preview_flags() {
        let config = parse(&[
            "--mode",
            "classify",
            "--confidence-threshold",
            "0.4",
            "--top-k",
            "2",
            "--preview",
            "400x800",
            "--fill",
            "fit",
            "--device-orientation",
            "landscape-left",
            "--switch-every",
            "10",
        ])
        .expect("config");
        assert_eq!(config.modes.initial, ModeKind::Classification);
        assert_eq!(
            config.modes.initial_mode(),
            AnalysisMode::Classification(ClassificationOptions::new(0.4, 2).unwrap())
        );
        assert_eq!(config.preview.fill, FillMode::Fit);
        assert_eq!(
            config.preview.device_orientation,
            DeviceOrientation::LandscapeLeft
        );
        assert_eq!(config.switch_every, Some(10));

        let layout = config.preview.layout((640, 480));
        assert_eq!(
            layout.fill,
            FillStrategy::AspectFit {
                image: Size::new(640.0, 480.0)
            }
        );
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse(&["--min-relative-size", "0"]).is_err());
        assert!(parse(&["--max-observations", "0"]).is_err());
        assert!(parse(&["--confidence-threshold", "1.5"]).is_err());
        assert!(parse(&["--top-k", "0"]).is_err());
        assert!(parse(&["--fps", "0"]).is_err());
        assert!(parse(&["--preview", "400"]).is_err());
        assert!(parse(&["--switch-every", "0"]).is_err());
    }

    #[test]
    fn labels_require_a_model() {
        assert!(parse(&["--labels", "labels.txt"]).is_err());
    }
}
