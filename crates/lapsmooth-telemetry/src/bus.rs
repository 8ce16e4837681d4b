//! Event bus: broadcast-style event dispatch with pluggable sinks.
//!
//! The bus uses `std::sync::mpsc` for event delivery. Sinks are
//! registered once at initialization and receive events on `flush`.

use std::sync::mpsc;

use crate::events::PipelineEvent;
use crate::sinks::EventSink;

/// Broadcast event bus for pipeline telemetry.
///
/// The producer side (`emit`) queues events; `flush` hands every queued
/// event to each registered sink in registration order.
pub struct EventBus {
    sender: mpsc::Sender<PipelineEvent>,
    receiver: mpsc::Receiver<PipelineEvent>,
    sinks: Vec<Box<dyn EventSink>>,
    /// Disabled bus is a no-op.
    enabled: bool,
    emitted: u64,
}

impl EventBus {
    /// Creates a new event bus with no sinks.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            sinks: Vec::new(),
            enabled: true,
            emitted: 0,
        }
    }

    /// Registers a sink to receive events.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Builder form of [`add_sink`](Self::add_sink).
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.add_sink(sink);
        self
    }

    /// Enables or disables the bus. Disabled bus drops events silently.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit an event. If the bus is disabled, this is a no-op.
    pub fn emit(&mut self, event: PipelineEvent) {
        if !self.enabled {
            return;
        }
        // The receiver lives as long as the bus, so this cannot fail.
        let _ = self.sender.send(event);
        self.emitted += 1;
    }

    /// Deliver all pending events to registered sinks.
    pub fn flush(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            for sink in &mut self.sinks {
                sink.handle(&event);
            }
        }
    }

    /// Flushes, then lets every sink finalize its output.
    pub fn finish(&mut self) {
        self.flush();
        for sink in &mut self.sinks {
            sink.finalize();
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Events accepted since construction.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
