//! Pluggable event sinks.

use std::sync::{Arc, Mutex};

use crate::events::PipelineEvent;

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &PipelineEvent);

    /// Called when the pipeline ends. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Events collected by a [`VecSink`], readable after the sink has been
/// handed to a bus.
pub type SharedEvents = Arc<Mutex<Vec<PipelineEvent>>>;

/// Collects events in memory for tests and inspection.
#[derive(Default)]
pub struct VecSink {
    events: SharedEvents,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the collected events.
    pub fn events(&self) -> SharedEvents {
        Arc::clone(&self.events)
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// Forwards events to `tracing` at one configured level.
///
/// Diagnostic events are logged at that level too: the importer already
/// warns about each one where it is found.
pub struct TracingSink {
    level: tracing::Level,
}

impl TracingSink {
    pub fn new(level: tracing::Level) -> Self {
        Self { level }
    }

    pub fn level(&self) -> tracing::Level {
        self.level
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(tracing::Level::INFO)
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &PipelineEvent) {
        let stage = event.stage().map(|s| s.name()).unwrap_or("unknown");
        let kind = &event.kind;
        let level = self.level;
        if level == tracing::Level::TRACE {
            tracing::trace!(stage, event = ?kind, "pipeline_event");
        } else if level == tracing::Level::DEBUG {
            tracing::debug!(stage, event = ?kind, "pipeline_event");
        } else if level == tracing::Level::INFO {
            tracing::info!(stage, event = ?kind, "pipeline_event");
        } else if level == tracing::Level::WARN {
            tracing::warn!(stage, event = ?kind, "pipeline_event");
        } else {
            tracing::error!(stage, event = ?kind, "pipeline_event");
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
