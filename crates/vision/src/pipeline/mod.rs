//! Real-time analysis pipeline.
//!
//! - `config`: CLI configuration parsing.
//! - `controller`: Active mode, epochs and the analysis worker.
//! - `mailbox`: Single-slot hand-off between producer and worker.
//! - `results`: Epoch check and overlay hand-off on the consumer side.
//! - `telemetry`: Tracing subscribers and the Prometheus recorder.

pub use config::{
    AnalyzeCliArgs, AnalyzeConfig, FillMode, ModeChoice, ModeCliArgs, ModeSettings,
    PipelineCliArgs, PipelineConfig, PreviewCliArgs, PreviewSettings, TelemetryOptions,
};
pub use controller::{
    AnalysisOutcome, ModeSnapshot, PipelineController, PipelineError, RESULT_QUEUE_DEPTH,
    StatsSnapshot, SubmitOutcome,
};
pub use results::ResultHandler;

mod config;
mod controller;
mod mailbox;
mod results;
pub mod telemetry;
