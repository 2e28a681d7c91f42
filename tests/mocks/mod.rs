//! Scripted collaborators for the sampling loop

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use procwatch_monitor::error::{LaunchError, LaunchResult};
use procwatch_monitor::snapshot::{CpuTimes, IoCounters};
use procwatch_monitor::{Liveness, MonitoredProcess, OutputSink, ProcessLauncher, RawSnapshot, Sample, SnapshotReader};

pub const MB: u64 = 1024 * 1024;

/// Build a snapshot from megabyte and second values.
pub fn snapshot(memory_mb: f64, cpu_seconds: f64, read_mb: f64, write_mb: f64) -> RawSnapshot {
    let to_bytes = |mb: f64| (mb * MB as f64).round() as u64;
    RawSnapshot {
        memory_bytes: to_bytes(memory_mb),
        cpu: CpuTimes { user: cpu_seconds, system: 0.0 },
        io: IoCounters { read_bytes: to_bytes(read_mb), write_bytes: to_bytes(write_mb) },
        process_count: 1,
    }
}

/// Sink that records everything it receives. Clones share the record.
#[derive(Clone)]
pub struct RecordingSink {
    name: String,
    samples: Arc<Mutex<Vec<Sample>>>,
    closes: Arc<Mutex<usize>>,
}

impl RecordingSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            samples: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(Mutex::new(0)),
        }
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn close_count(&self) -> usize {
        self.closes.lock().map(|c| *c).unwrap_or_default()
    }

    pub fn boxed(&self) -> Box<dyn OutputSink> {
        Box::new(self.clone())
    }
}

impl OutputSink for RecordingSink {
    fn emit(&mut self, sample: &Sample) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.push(*sample);
        }
    }

    fn close(&mut self) {
        if let Ok(mut closes) = self.closes.lock() {
            *closes += 1;
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Reader that replays a fixed script of snapshots, then reports the
/// process as gone.
pub struct ScriptedReader {
    script: VecDeque<Option<RawSnapshot>>,
    reads: Arc<Mutex<usize>>,
}

impl ScriptedReader {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Option<RawSnapshot>>,
    {
        Self {
            script: script.into_iter().collect(),
            reads: Arc::new(Mutex::new(0)),
        }
    }

    /// Same snapshot `count` times.
    pub fn repeating(snapshot: RawSnapshot, count: usize) -> Self {
        Self::new(std::iter::repeat(Some(snapshot)).take(count))
    }

    /// Shared read counter, usable after the reader moved into a monitor.
    pub fn read_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.reads)
    }
}

impl SnapshotReader for ScriptedReader {
    fn read(&mut self, _pid: u32) -> Option<RawSnapshot> {
        if let Ok(mut reads) = self.reads.lock() {
            *reads += 1;
        }
        self.script.pop_front().flatten()
    }
}

/// Process that reports running until a given number of polls.
pub struct ScriptedProcess {
    pid: u32,
    exit_after_polls: Option<usize>,
    exit_code: Option<i32>,
    polls: usize,
}

impl MonitoredProcess for ScriptedProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn poll(&mut self) -> Liveness {
        self.polls += 1;
        match self.exit_after_polls {
            Some(limit) if self.polls > limit => Liveness::Exited(self.exit_code),
            _ => Liveness::Running,
        }
    }
}

/// Launcher producing [`ScriptedProcess`] values.
#[derive(Debug, Clone)]
pub struct ScriptedLauncher {
    pub pid: u32,
    pub exit_after_polls: Option<usize>,
    pub exit_code: Option<i32>,
    pub fail_with: Option<String>,
}

impl ScriptedLauncher {
    /// A process that never exits on its own.
    pub fn running(pid: u32) -> Self {
        Self {
            pid,
            exit_after_polls: None,
            exit_code: None,
            fail_with: None,
        }
    }

    /// A process that exits with `code` once polled more than `polls` times.
    pub fn exiting_after(pid: u32, polls: usize, code: i32) -> Self {
        Self {
            pid,
            exit_after_polls: Some(polls),
            exit_code: Some(code),
            fail_with: None,
        }
    }

    /// A launcher whose spawn always fails.
    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::running(0)
        }
    }
}

impl ProcessLauncher for ScriptedLauncher {
    type Process = ScriptedProcess;

    fn launch(&mut self, command: &[String]) -> LaunchResult<ScriptedProcess> {
        let program = command.first().ok_or(LaunchError::EmptyCommand)?;
        if let Some(reason) = &self.fail_with {
            return Err(LaunchError::SpawnFailed {
                program: program.clone(),
                reason: reason.clone(),
            });
        }

        Ok(ScriptedProcess {
            pid: self.pid,
            exit_after_polls: self.exit_after_polls,
            exit_code: self.exit_code,
            polls: 0,
        })
    }
}
