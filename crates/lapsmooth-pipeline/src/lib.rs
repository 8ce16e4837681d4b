//! # lapsmooth-pipeline
//!
//! Orchestrates a smoothing run: import, adjacency, device upload,
//! ping-pong smoothing and export, with per-stage metrics and telemetry
//! events.

pub mod metrics;
pub mod runner;

pub use metrics::PipelineMetrics;
pub use runner::{create_backend, Pipeline, PipelineReport};
