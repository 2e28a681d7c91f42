//! Output sinks for collected samples
//!
//! Every sink follows the same lifecycle: construction, any number of
//! `emit` calls, then `close`. Sinks contain their own faults; a failing
//! sink never interrupts the sampling loop.

use tracing::{info, warn};

use crate::composite::CompositeSink;
use crate::config::{MetricsConfig, OutputConfig};
use crate::console::ConsoleSink;
use crate::sample::Sample;

/// Destination for samples.
pub trait OutputSink: Send {
    /// Deliver one sample. Failures are handled inside the sink.
    fn emit(&mut self, sample: &Sample);

    /// Release resources. Calls after the first have no effect.
    fn close(&mut self);

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Owns a sink for the duration of a run and closes it exactly once,
/// including when the run bails out early.
pub struct SinkGuard {
    sink: Box<dyn OutputSink>,
    closed: bool,
}

impl SinkGuard {
    pub fn new(sink: Box<dyn OutputSink>) -> Self {
        Self { sink, closed: false }
    }

    pub fn emit(&mut self, sample: &Sample) {
        if !self.closed {
            self.sink.emit(sample);
        }
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.sink.close();
        }
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build the run's sinks from configuration, starting the metrics endpoint
/// when it is enabled and available.
pub fn build_sinks(config: &OutputConfig) -> CompositeSink {
    build_sinks_with(config, create_metrics_sink)
}

/// Build the run's sinks with a caller-supplied metrics constructor.
///
/// The constructor returns `None` when the capability is unavailable; the
/// run then continues with the remaining sinks, possibly none.
pub fn build_sinks_with<F>(config: &OutputConfig, metrics_factory: F) -> CompositeSink
where
    F: FnOnce(&MetricsConfig) -> Option<Box<dyn OutputSink>>,
{
    let mut sinks = CompositeSink::new();

    if config.console {
        sinks.add(Box::new(ConsoleSink::stdout()));
    }

    if config.metrics.enabled {
        match metrics_factory(&config.metrics) {
            Some(sink) => sinks.add(sink),
            None => warn!("Metrics endpoint unavailable, continuing without it"),
        }
    }

    info!(sinks = ?sinks.names(), "Output sinks configured");
    sinks
}

/// Start the Prometheus endpoint, or `None` if it cannot be provided.
#[cfg(feature = "metrics")]
pub fn create_metrics_sink(config: &MetricsConfig) -> Option<Box<dyn OutputSink>> {
    match crate::metrics::MetricsSink::start(config) {
        Ok(sink) => {
            println!("Prometheus server running on port {}", sink.local_addr().port());
            Some(Box::new(sink))
        }
        Err(e) => {
            warn!("Failed to start metrics server on {}: {}", config.socket_address(), e);
            None
        }
    }
}

/// Start the Prometheus endpoint, or `None` if it cannot be provided.
#[cfg(not(feature = "metrics"))]
pub fn create_metrics_sink(_config: &MetricsConfig) -> Option<Box<dyn OutputSink>> {
    println!("Prometheus support not compiled in. Prometheus support will be disabled.");
    None
}
