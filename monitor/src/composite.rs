//! Fan-out over several sinks

use tracing::debug;

use crate::sample::Sample;
use crate::sink::OutputSink;

/// Forwards each sample to every member in registration order.
#[derive(Default)]
pub struct CompositeSink {
    sinks: Vec<Box<dyn OutputSink>>,
    closed: bool,
}

impl CompositeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Box<dyn OutputSink>) {
        debug!("Registering output sink: {}", sink.name());
        self.sinks.push(sink);
    }

    pub fn with(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.add(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }
}

impl OutputSink for CompositeSink {
    fn emit(&mut self, sample: &Sample) {
        for sink in &mut self.sinks {
            sink.emit(sample);
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for sink in &mut self.sinks {
            sink.close();
        }
    }

    fn name(&self) -> &str {
        "composite"
    }
}
