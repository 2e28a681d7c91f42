//! procwatch monitoring library
//!
//! Launches a command, samples the memory, CPU time and I/O of its whole
//! process tree at a fixed frequency, streams every sample to the configured
//! output sinks and hands back the collected series for charting.

pub mod composite;
pub mod config;
pub mod console;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod monitor;
pub mod process;
pub mod procfs;
pub mod rate;
pub mod render;
pub mod sample;
pub mod shutdown;
pub mod sink;
pub mod snapshot;

pub use composite::CompositeSink;
pub use config::MonitorConfig;
pub use console::ConsoleSink;
pub use error::{MonitorError, Result};
#[cfg(feature = "metrics")]
pub use metrics::MetricsSink;
pub use monitor::{Monitor, MonitorRun, MonitorState, Termination};
pub use process::{CommandLauncher, Liveness, MonitoredProcess, ProcessLauncher};
pub use rate::{cpu_percent, CpuRateTracker};
pub use render::SeriesRenderer;
pub use sample::{Sample, SampleSeries};
pub use shutdown::ShutdownSignal;
pub use sink::{build_sinks, build_sinks_with, create_metrics_sink, OutputSink, SinkGuard};
pub use snapshot::{RawSnapshot, SnapshotReader, SystemSnapshotReader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
