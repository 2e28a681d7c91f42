//! The sampling loop
//!
//! A run moves through three states: `Starting` (launch the command),
//! `Sampling` (poll, read, rate, emit, sleep) and `Terminated`. It ends when
//! the child exits, when its snapshot can no longer be read, or when
//! cancellation is requested. Samples are appended and emitted in
//! collection order, and the sink is closed exactly once on every path.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::SamplingConfig;
use crate::error::Result;
use crate::process::{CommandLauncher, Liveness, MonitoredProcess, ProcessLauncher};
use crate::rate::CpuRateTracker;
use crate::sample::{Sample, SampleSeries};
use crate::shutdown::ShutdownSignal;
use crate::sink::{OutputSink, SinkGuard};
use crate::snapshot::{SnapshotReader, SystemSnapshotReader};

/// Lifecycle of a monitoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Starting,
    Sampling,
    Terminated,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The child was reaped, with its exit code when it has one
    ProcessExited(Option<i32>),

    /// The snapshot reader no longer found the process
    ProcessVanished,

    /// Interrupted by the user
    Cancelled,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct MonitorRun {
    pub pid: u32,
    pub series: SampleSeries,
    pub termination: Termination,
}

/// Drives one command from launch to termination.
pub struct Monitor<R, L> {
    config: SamplingConfig,
    reader: R,
    launcher: L,
    shutdown: ShutdownSignal,
    state: MonitorState,
}

impl Monitor<SystemSnapshotReader, CommandLauncher> {
    /// Monitor real processes via the operating system.
    pub fn system(config: SamplingConfig, shutdown: ShutdownSignal) -> Self {
        Self::new(config, SystemSnapshotReader::new(), CommandLauncher::new(), shutdown)
    }
}

impl<R, L> Monitor<R, L>
where
    R: SnapshotReader,
    L: ProcessLauncher,
{
    pub fn new(config: SamplingConfig, reader: R, launcher: L, shutdown: ShutdownSignal) -> Self {
        Self {
            config,
            reader,
            launcher,
            shutdown,
            state: MonitorState::Idle,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Launch `command` and sample it until it ends.
    ///
    /// Launch failures are returned as errors; every other ending is a normal
    /// [`MonitorRun`]. `sink` is closed before this returns in all cases.
    pub async fn run(&mut self, command: &[String], sink: Box<dyn OutputSink>) -> Result<MonitorRun> {
        let mut sink = SinkGuard::new(sink);

        self.transition(MonitorState::Starting);
        let mut process = match self.launcher.launch(command) {
            Ok(process) => process,
            Err(e) => {
                self.transition(MonitorState::Terminated);
                sink.close();
                return Err(e.into());
            }
        };
        let pid = process.pid();
        let started = Instant::now();
        let interval = self.config.interval();
        let mut rate = CpuRateTracker::new();
        let mut series = SampleSeries::new();

        info!(pid, interval_ms = interval.as_millis() as u64, "Monitoring started");
        self.transition(MonitorState::Sampling);

        let termination = loop {
            if self.shutdown.is_triggered() {
                break Termination::Cancelled;
            }

            if let Liveness::Exited(code) = process.poll() {
                break Termination::ProcessExited(code);
            }

            let now = Instant::now();
            let snapshot = match self.reader.read(pid) {
                Some(snapshot) => snapshot,
                None => break Termination::ProcessVanished,
            };

            let elapsed = now.duration_since(started).as_secs_f64();
            let cpu_percent = rate.observe(snapshot.cpu.total(), elapsed);
            let sample = Sample::from_snapshot(elapsed, cpu_percent, &snapshot);

            series.push(sample);
            sink.emit(&sample);
            debug!(
                elapsed,
                memory_mb = sample.memory_mb,
                cpu_percent = sample.cpu_percent,
                "Sample collected"
            );

            if self.pause(interval).await.is_break() {
                break Termination::Cancelled;
            }
        };

        self.transition(MonitorState::Terminated);
        sink.close();

        info!(pid, samples = series.len(), ?termination, "Monitoring finished");
        Ok(MonitorRun { pid, series, termination })
    }

    async fn pause(&self, interval: Duration) -> ControlFlow<()> {
        tokio::select! {
            _ = self.shutdown.triggered() => ControlFlow::Break(()),
            _ = tokio::time::sleep(interval) => ControlFlow::Continue(()),
        }
    }

    fn transition(&mut self, next: MonitorState) {
        debug!(from = ?self.state, to = ?next, "Monitor state change");
        self.state = next;
    }
}
