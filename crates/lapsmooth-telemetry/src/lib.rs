//! # lapsmooth-telemetry
//!
//! Event bus for pipeline telemetry. Emits structured events (stage
//! completion, per-iteration dispatches, diagnostics) that can be
//! consumed by pluggable sinks.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, PipelineEvent, Stage};
pub use sinks::{EventSink, TracingSink, VecSink};
